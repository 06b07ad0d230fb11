use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="container py-5 text-center">
			<h1>"Page not found"</h1>
			<p class="text-muted">"The page you asked for does not exist."</p>
			<a class="btn btn-primary" href="/">"Back to the desk"</a>
		</div>
	}
}
