mod singleton;

use proc_macro::TokenStream;

/// Derive `rusty_lifecycle::Singleton`.
///
/// Accepts an optional `#[singleton(...)]` attribute:
///
/// - `on_duplicate = "reject" | "discard_duplicate" | "discard_container"`
/// - `persistent`
#[proc_macro_derive(Singleton, attributes(singleton))]
pub fn derive_singleton(item: TokenStream) -> TokenStream {
    singleton::derive_singleton(item)
}
