use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use std::env;
use std::fs;
use std::path::PathBuf;
use syn::parse::{Parse, ParseStream};
use syn::{Error, LitByteStr, LitInt, LitStr, Token, parse_macro_input};

const DEFAULT_LEVEL: i32 = 19;

macro_rules! bail {
    ($call:expr) => {
        match $call {
            Ok(val) => val,
            Err(err) => return Error::new(Span::call_site(), err).to_compile_error().into(),
        }
    };
}

/// `"relative/path"` with an optional `, level` suffix.
struct IncludeArgs {
    path: LitStr,
    level: Option<LitInt>,
}

impl Parse for IncludeArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path: LitStr = input.parse()?;
        let level = if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                None
            } else {
                Some(input.parse()?)
            }
        } else {
            None
        };
        Ok(IncludeArgs { path, level })
    }
}

/// Compress a file at build time and embed it as a `&[u8]` zstd frame.
///
/// The path is resolved against `CARGO_MANIFEST_DIR`. The expansion also
/// references the file through `include_bytes!` so edits to it trigger a
/// rebuild.
#[proc_macro]
pub fn include_zstd(input: TokenStream) -> TokenStream {
    let IncludeArgs { path, level } = parse_macro_input!(input as IncludeArgs);

    let level = match level {
        Some(lit) => {
            let value = bail!(lit.base10_parse::<i32>());
            if !(1..=22).contains(&value) {
                return Error::new(lit.span(), "zstd level must be between 1 and 22")
                    .to_compile_error()
                    .into();
            }
            value
        }
        None => DEFAULT_LEVEL,
    };

    let manifest_dir = bail!(env::var("CARGO_MANIFEST_DIR"));
    let full_path = PathBuf::from(manifest_dir).join(path.value());
    let Some(full_path_str) = full_path.to_str().map(str::to_owned) else {
        return Error::new(path.span(), "path is not valid UTF-8")
            .to_compile_error()
            .into();
    };

    let content = bail!(fs::read(&full_path));
    let compressed_data = bail!(zstd::stream::encode_all(&content[..], level));
    let literal_bytes = LitByteStr::new(&compressed_data, Span::call_site());

    let output = quote!({
        const _: &[u8] = include_bytes!(#full_path_str);
        #literal_bytes
    });

    output.into()
}
