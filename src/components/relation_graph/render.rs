use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::engine::LayoutEngine;
use super::state::RelationGraphState;
use crate::components::tag_autocomplete::CATEGORY_COLORS;

const LABEL_CHARS: usize = 8;

pub fn relation_color(relation_type: &str) -> &'static str {
	match relation_type {
		"symptom_to_cause" => "#dc3545",
		"cause_to_treatment" => "#28a745",
		"method_to_location" => "#007bff",
		"same_category" => "#6c757d",
		"co_occurrence" => "#17a2b8",
		_ => "#999999",
	}
}

/// Short label drawn on strong links.
pub fn relation_label(relation_type: &str) -> &'static str {
	match relation_type {
		"symptom_to_cause" => "症→因",
		"cause_to_treatment" => "因→治",
		"method_to_location" => "法→位",
		"same_category" => "同類",
		"co_occurrence" => "共現",
		_ => "",
	}
}

pub fn node_label(name: &str) -> String {
	if name.chars().count() > LABEL_CHARS {
		format!("{}...", name.chars().take(LABEL_CHARS).collect::<String>())
	} else {
		name.to_string()
	}
}

pub fn render<E: LayoutEngine>(state: &RelationGraphState<E>, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_links(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
	draw_legend(ctx);
}

fn draw_links<E: LayoutEngine>(state: &RelationGraphState<E>, ctx: &CanvasRenderingContext2d) {
	for (i, link) in state.links.iter().enumerate() {
		let (a, b) = (state.position(link.source), state.position(link.target));
		ctx.set_global_alpha(state.link_opacity(i));
		ctx.set_stroke_style_str(relation_color(&link.relation_type));
		ctx.set_line_width((link.strength * 3.0).max(1.0));
		let dash = if link.relation_type == "same_category" {
			js_sys::Array::of2(&JsValue::from_f64(5.0), &JsValue::from_f64(5.0))
		} else {
			js_sys::Array::new()
		};
		let _ = ctx.set_line_dash(&dash);
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();

		if link.strength > 0.5 {
			let label = relation_label(&link.relation_type);
			if !label.is_empty() {
				ctx.set_fill_style_str("#666666");
				ctx.set_font("10px sans-serif");
				ctx.set_text_align("center");
				let _ = ctx.fill_text(label, (a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
			}
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_global_alpha(1.0);
}

fn draw_nodes<E: LayoutEngine>(state: &RelationGraphState<E>, ctx: &CanvasRenderingContext2d) {
	ctx.set_text_align("center");
	for (i, node) in state.nodes.iter().enumerate() {
		let p = state.position(i);
		ctx.set_global_alpha(state.node_opacity(i));
		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, node.size, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.color);
		ctx.fill();
		ctx.set_stroke_style_str("#ffffff");
		ctx.set_line_width(state.node_stroke(i));
		ctx.stroke();

		let weight = if node.level == 0 { "bold " } else { "" };
		ctx.set_font(&format!("{weight}11px sans-serif"));
		ctx.set_fill_style_str("#333333");
		let _ = ctx.fill_text(&node_label(&node.name), p.x, p.y + node.size + 15.0);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_legend(ctx: &CanvasRenderingContext2d) {
	ctx.set_text_align("left");
	ctx.set_font("12px sans-serif");
	for (i, (name, color)) in CATEGORY_COLORS.iter().enumerate() {
		let (x, y) = (20.0, 20.0 + i as f64 * 20.0);
		ctx.begin_path();
		let _ = ctx.arc(x, y, 6.0, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(color);
		ctx.fill();
		ctx.set_fill_style_str("#333333");
		let _ = ctx.fill_text(name, x + 15.0, y + 4.0);
	}
}
