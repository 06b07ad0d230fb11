use leptos::prelude::*;

use crate::services::notify::Notifier;

/// Fixed toast stack in the top-right corner of the page.
#[component]
pub fn NotificationStack(notifier: Notifier) -> impl IntoView {
	let queue = notifier.queue();

	view! {
		<div
			class="toast-stack"
			style="position: fixed; top: 20px; right: 20px; z-index: 9999; max-width: 360px;"
		>
			<For
				each=move || queue.with(|q| q.toasts().to_vec())
				key=|toast| toast.id
				children=move |toast| {
					let id = toast.id;
					view! {
						<div class=format!("toast show {}", toast.level.css_class()) role="alert">
							<span class="toast-message">{toast.message}</span>
							<button
								type="button"
								class="btn-close"
								aria-label="Close"
								on:click=move |_| notifier.dismiss(id)
							/>
						</div>
					}
				}
			/>
		</div>
	}
}
