mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the summary, the rest becomes the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates the `CreateXInput` and `UpdateXInput` structs for a stored model.
///
/// Fields marked `#[model(skip)]` are left out of both inputs, fields marked
/// `#[model(create_only)]` are left out of the update input. Every other field is copied
/// with its attributes, and wrapped in an `Option` for the update input.
///
/// Pass `#[model(create)]` or `#[model(update)]` to only generate one of them.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(args, input)
}
