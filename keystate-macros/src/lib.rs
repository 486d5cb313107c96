use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl, ReturnType,
    Stmt, Variant, Visibility,
};

/// Turns an enum into a keystate error type that can cross the FFI boundary.
///
/// The macro:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Appends a `Generic { message: String }` variant unless the enum already declares one
/// 3. Implements `From<anyhow::Error>`, flattening the context chain into `message`
/// 4. Adds `from_anyhow_result` / `from_anyhow_result_with_prefix` helpers
///
/// # Usage
///
/// ```rust,ignore
/// #[keystate_error]
/// pub enum MigrationError {
///     #[error("missing required key {key}")]
///     MissingRequiredKey { key: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn keystate_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "keystate_error can only be applied to enums")
            .to_compile_error()
            .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // Derives and uniffi attributes are re-emitted below
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        let generic_variant: Variant = syn::parse_quote! {
            /// A generic error that wraps an `anyhow` error chain.
            #[error("Generic error: {message}")]
            Generic {
                /// The flattened error chain.
                message: String
            }
        };
        variants.push(generic_variant);
    }

    let expanded = quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                Self::Generic {
                    message: Self::flatten_anyhow_chain(&err),
                }
            }
        }

        impl #generics #enum_name #generics {
            /// Renders an `anyhow` error and its causes as `outer (caused by: a -> b)`.
            fn flatten_anyhow_chain(err: &anyhow::Error) -> String {
                let mut message = err.to_string();
                let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
                if !chain.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&chain.join(" -> "));
                    message.push(')');
                }
                message
            }

            /// Converts an `anyhow::Result` into a result carrying this error type.
            ///
            /// # Errors
            /// Returns the `Generic` variant when `result` is an error.
            pub fn from_anyhow_result<T>(result: anyhow::Result<T>) -> Result<T, Self> {
                result.map_err(Self::from)
            }

            /// Same as [`Self::from_anyhow_result`], prefixing the message.
            ///
            /// # Errors
            /// Returns the `Generic` variant when `result` is an error.
            pub fn from_anyhow_result_with_prefix<T>(
                result: anyhow::Result<T>,
                prefix: &str,
            ) -> Result<T, Self> {
                result.map_err(|err| Self::Generic {
                    message: format!("{}: {}", prefix, Self::flatten_anyhow_chain(&err)),
                })
            }
        }
    };

    TokenStream::from(expanded)
}

/// Wraps `uniffi::export` and injects a logging context into every public method.
///
/// The macro:
/// 1. Forwards its arguments to `#[uniffi::export]`
/// 2. Gives every `pub fn` the logging context `[KeyState][Type]`: sync methods get
///    `let _keystate_logger_ctx = crate::primitives::logger::LogContext::new("Type");` as
///    their first statement, async methods run their body inside
///    `crate::primitives::logger::in_log_context`, so the context follows the task
/// 3. Adds `async_runtime = "tokio"` when any public method is `async`
///
/// # Usage
///
/// ```rust,ignore
/// #[keystate_export]
/// impl MigrationController {
///     pub async fn migrate_if_needed(&self) -> Result<MigrationRunSummary, MigrationError> {
///         // messages logged here are prefixed with [KeyState][MigrationController]
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn keystate_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);

    let type_name = match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    };

    let has_async_functions = has_async_functions_in_impl(&input_impl.items);

    let new_items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut new_method = method.clone();
                inject_logging_context(&mut new_method, &type_name);
                ImplItem::Fn(new_method)
            }
            other => other.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items: new_items,
        ..input_impl
    };

    let args = export_args(proc_macro2::TokenStream::from(args), has_async_functions);

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

/// Appends the tokio runtime selector to the export arguments when needed.
fn export_args(
    args: proc_macro2::TokenStream,
    has_async_functions: bool,
) -> proc_macro2::TokenStream {
    match (has_async_functions, args.is_empty()) {
        (false, _) => args,
        (true, true) => quote! { async_runtime = "tokio" },
        (true, false) => quote! { #args, async_runtime = "tokio" },
    }
}

/// Whether any public method in the impl block is async
fn has_async_functions_in_impl(impl_items: &[ImplItem]) -> bool {
    impl_items.iter().any(|item| {
        matches!(
            item,
            ImplItem::Fn(method)
                if matches!(method.vis, Visibility::Public(_)) && method.sig.asyncness.is_some()
        )
    })
}

fn inject_logging_context(method: &mut ImplItemFn, type_name: &str) {
    if method.sig.asyncness.is_some() {
        let output = match &method.sig.output {
            ReturnType::Default => quote! { () },
            ReturnType::Type(_, ty) => quote! { #ty },
        };
        let body = &method.block;
        method.block = syn::parse_quote! {
            {
                crate::primitives::logger::in_log_context::<#output, _>(
                    #type_name,
                    async move #body,
                )
                .await
            }
        };
        return;
    }

    let context_stmt: Stmt = syn::parse_quote! {
        let _keystate_logger_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };
    method.block.stmts.insert(0, context_stmt);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_detection_with_async_functions() {
        let impl_block: ItemImpl = syn::parse_quote! {
            impl MigrationController {
                pub fn latest_version(&self) -> i32 {
                    4
                }

                pub async fn migrate_if_needed(&self) -> i32 {
                    4
                }
            }
        };

        assert!(has_async_functions_in_impl(&impl_block.items));
    }

    #[test]
    fn test_async_detection_ignores_private_async_functions() {
        let impl_block: ItemImpl = syn::parse_quote! {
            impl MigrationController {
                pub fn latest_version(&self) -> i32 {
                    4
                }

                async fn run_chain(&self) -> i32 {
                    4
                }
            }
        };

        assert!(!has_async_functions_in_impl(&impl_block.items));
    }

    #[test]
    fn test_export_args_without_async() {
        let args = export_args(proc_macro2::TokenStream::new(), false);
        assert!(args.is_empty());
    }

    #[test]
    fn test_export_args_adds_tokio_runtime() {
        let args = export_args(proc_macro2::TokenStream::new(), true);
        assert_eq!(args.to_string(), "async_runtime = \"tokio\"");

        let args = export_args(quote! { with_foreign }, true);
        assert_eq!(args.to_string(), "with_foreign , async_runtime = \"tokio\"");
    }

    #[test]
    fn test_logging_context_is_first_statement() {
        let mut method: ImplItemFn = syn::parse_quote! {
            pub fn latest_version(&self) -> i32 {
                4
            }
        };

        inject_logging_context(&mut method, "MigrationController");

        let first = &method.block.stmts[0];
        let rendered = quote! { #first }.to_string();
        assert!(rendered.contains("_keystate_logger_ctx"));
        assert!(rendered.contains("\"MigrationController\""));
    }

    #[test]
    fn test_async_body_runs_inside_task_local_context() {
        let mut method: ImplItemFn = syn::parse_quote! {
            pub async fn migrate_if_needed(&self) -> Result<MigrationRunSummary, MigrationError> {
                self.run().await
            }
        };

        inject_logging_context(&mut method, "MigrationController");

        assert_eq!(method.block.stmts.len(), 1);
        let body = &method.block;
        let rendered = quote! { #body }.to_string();
        assert!(rendered.contains("in_log_context"));
        assert!(rendered.contains("Result < MigrationRunSummary , MigrationError > , _"));
        assert!(rendered.contains("\"MigrationController\""));
        assert!(rendered.contains("async move"));
        assert!(!rendered.contains("_keystate_logger_ctx"));
    }

    #[test]
    fn test_async_body_without_return_type_yields_unit() {
        let mut method: ImplItemFn = syn::parse_quote! {
            pub async fn warm_up(&self) {}
        };

        inject_logging_context(&mut method, "MigrationController");

        let body = &method.block;
        let rendered = quote! { #body }.to_string();
        assert!(rendered.contains("in_log_context :: < () , _ >"));
    }
}
