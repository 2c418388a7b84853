use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

/// Options parsed from `#[singleton(...)]`.
#[derive(Default)]
struct Options {
    on_duplicate: Option<TokenStream2>,
    persistent: bool,
}

fn parse_options(ast: &DeriveInput) -> syn::Result<Options> {
    let mut options = Options::default();
    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("singleton")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("persistent") {
                options.persistent = true;
                return Ok(());
            }
            if meta.path.is_ident("on_duplicate") {
                let value: LitStr = meta.value()?.parse()?;
                let variant = match value.value().as_str() {
                    "reject" => quote!(Reject),
                    "discard_duplicate" => quote!(DiscardDuplicate),
                    "discard_container" => quote!(DiscardContainer),
                    other => {
                        return Err(syn::Error::new(
                            value.span(),
                            format!(
                                "unknown duplicate action '{other}', expected one of \
                                 \"reject\", \"discard_duplicate\", \"discard_container\""
                            ),
                        ));
                    }
                };
                options.on_duplicate = Some(variant);
                return Ok(());
            }
            Err(meta.error("unsupported singleton option"))
        })?;
    }
    Ok(options)
}

pub fn derive_singleton(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let options = match parse_options(&ast) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let on_duplicate = options.on_duplicate.map(|variant| {
        quote! {
            const ON_DUPLICATE: ::rusty_lifecycle::DuplicateAction =
                ::rusty_lifecycle::DuplicateAction::#variant;
        }
    });
    let persistent = options.persistent.then(|| {
        quote! {
            const PERSISTENT: bool = true;
        }
    });

    // `::rusty_lifecycle` resolves inside the crate through `extern crate self as rusty_lifecycle;`
    // in lib.rs, and naturally outside it.
    TokenStream::from(quote! {
        impl #impl_generics ::rusty_lifecycle::Singleton for #struct_name #ty_generics #where_clause {
            #on_duplicate
            #persistent
        }
    })
}
