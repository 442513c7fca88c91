use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Attribute, Field, Fields, ItemStruct, Path, Token};

#[derive(Default, FromMeta)]
struct ModelArgs {
	#[darling(default)]
	create: bool,
	#[darling(default)]
	update: bool,
}

#[derive(Default, FromMeta)]
struct FieldArgs {
	#[darling(default)]
	skip: bool,
	#[darling(default)]
	create_only: bool,
}

struct InputField {
	field: Field,
	create_only: bool,
}

pub fn from_input(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = match NestedMeta::parse_meta_list(args.into()) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let args = match ModelArgs::from_list(&args) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let mut item = syn::parse_macro_input!(input as ItemStruct);

	match expand(&args, &mut item) {
		Ok(tokens) => tokens.into(),
		Err(e) => e.write_errors().into(),
	}
}

fn expand(args: &ModelArgs, item: &mut ItemStruct) -> darling::Result<TokenStream2> {
	let Fields::Named(named) = &mut item.fields else {
		return Err(darling::Error::custom("#[model] requires named fields").with_span(&item.ident));
	};

	let mut errors = darling::Error::accumulator();
	let mut fields = Vec::new();

	for field in &mut named.named {
		// `#[model(..)]` is not a real attribute, so it must not survive on the model itself
		let (markers, attrs) = field
			.attrs
			.drain(..)
			.partition::<Vec<_>, _>(|attr| attr.path().is_ident("model"));

		field.attrs = attrs;

		let options = markers
			.iter()
			.filter_map(|marker| errors.handle(FieldArgs::from_meta(&marker.meta)))
			.fold(FieldArgs::default(), |acc, next| FieldArgs {
				skip: acc.skip || next.skip,
				create_only: acc.create_only || next.create_only,
			});

		if options.skip {
			continue;
		}

		let mut input = field.clone();
		input.attrs.retain(|attr| !attr.path().is_ident("sqlx"));

		fields.push(InputField {
			field: input,
			create_only: options.create_only,
		});
	}

	let attrs = input_attrs(&item.attrs).map_err(|e| errors.push(e)).ok();

	errors.finish()?;

	let attrs = attrs.unwrap_or_default();
	let vis = &item.vis;
	let generics = &item.generics;
	let both = !args.create && !args.update;

	let create = (both || args.create).then(|| {
		let ident = format_ident!("Create{}Input", item.ident);
		let fields = fields.iter().map(|input| &input.field);

		quote! {
			#(#attrs)*
			#vis struct #ident #generics {
				#(#fields),*
			}
		}
	});

	let update = (both || args.update).then(|| {
		let ident = format_ident!("Update{}Input", item.ident);
		let fields = fields
			.iter()
			.filter(|input| !input.create_only)
			.map(|input| {
				let mut field = input.field.clone();
				let ty = &input.field.ty;

				field.ty = syn::parse_quote!(Option<#ty>);
				field
			});

		quote! {
			#(#attrs)*
			#vis struct #ident #generics {
				#(#fields),*
			}
		}
	});

	Ok(quote! {
		#item

		#create

		#update
	})
}

/// Copies the model's attributes onto the inputs, without anything that only makes
/// sense for a database row.
fn input_attrs(attrs: &[Attribute]) -> darling::Result<Vec<TokenStream2>> {
	let mut output = Vec::with_capacity(attrs.len());

	for attr in attrs {
		if attr.path().is_ident("sqlx") {
			continue;
		}

		if !attr.path().is_ident("derive") {
			output.push(attr.to_token_stream());
			continue;
		}

		let derives = attr
			.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)
			.map_err(darling::Error::from)?;

		let derives = derives
			.into_iter()
			.filter(|path| path.segments.last().map_or(true, |s| s.ident != "FromRow"));

		output.push(quote!(#[derive(#(#derives),*)]));
	}

	Ok(output)
}
