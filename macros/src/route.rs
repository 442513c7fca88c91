use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;

#[derive(FromMeta)]
struct RouteArgs {
	#[darling(multiple)]
	tag: Vec<syn::Expr>,
	#[darling(multiple)]
	response: Vec<ResponseArgs>,
}

#[derive(FromMeta)]
struct ResponseArgs {
	status: syn::LitInt,
	shape: Option<syn::Type>,
	description: Option<String>,
}

impl ResponseArgs {
	fn to_tokens(&self) -> TokenStream2 {
		let status = &self.status;
		let shape = self.shape.as_ref().map_or_else(|| quote!(()), |x| quote!(#x));

		match &self.description {
			Some(description) => quote! {
				.response_with::<#status, #shape, _>(|res| res.description(#description))
			},
			None => quote! {
				.response::<#status, #shape>()
			},
		}
	}
}

pub fn from_input(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = match NestedMeta::parse_meta_list(args.into()) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let args = match RouteArgs::from_list(&args) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let function = syn::parse_macro_input!(input as syn::ItemFn);

	let Some((summary, description)) = doc_comment(&function.attrs) else {
		return syn::Error::new(
			function.sig.ident.span(),
			"#[route] requires a doc comment, its first line is used as the summary",
		)
		.into_compile_error()
		.into();
	};

	let fn_name = format_ident!("{}_docs", function.sig.ident);
	let fn_vis = &function.vis;
	let span = function.sig.span();

	let tags = args.tag.iter();
	let responses = args.response.iter().map(ResponseArgs::to_tokens);

	quote::quote_spanned! {span=>
		#function

		#fn_vis fn #fn_name(op: aide::transform::TransformOperation) -> aide::transform::TransformOperation {
			op.summary(#summary).description(#description)
				#(
					.tag(#tags)
				)*
				#(
					#responses
				)*
		}
	}
	.into()
}

/// Splits the doc comment into a single-line summary and the remaining description.
///
/// When there is only one line, it is used for both.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<(String, String)> {
	let lines = attrs
		.iter()
		.filter(|attr| attr.path().is_ident("doc"))
		.filter_map(|attr| match &attr.meta {
			syn::Meta::NameValue(syn::MetaNameValue {
				value: syn::Expr::Lit(syn::ExprLit {
					lit: syn::Lit::Str(literal),
					..
				}),
				..
			}) => Some(literal.value().trim().to_owned()),
			_ => None,
		})
		.collect::<Vec<_>>();

	let (summary, rest) = lines.split_first()?;

	if summary.is_empty() {
		return None;
	}

	let description = rest
		.iter()
		.skip_while(|line| line.is_empty())
		.cloned()
		.collect::<Vec<_>>()
		.join("\n");

	let description = if description.is_empty() {
		summary.clone()
	} else {
		description
	};

	Some((summary.clone(), description))
}
