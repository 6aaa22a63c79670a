//! The built-in `String` module.

use super::ModuleArgs;

/// A `String` module function.
type StringFn = fn(&ModuleArgs) -> String;

/// Functions of the `String` module, by name.
pub(super) static FUNCTIONS: phf::Map<&'static str, StringFn> = phf::phf_map! {
    "len" => len,
};

/// `{{#invoke:String|len|s=text}}` or `{{#invoke:String|len|text}}`
///
/// Returns the length of the text in characters.
fn len(args: &ModuleArgs) -> String {
    let text = args
        .get("s")
        .or_else(|| args.get("1"))
        .map_or("", String::as_str);
    text.chars().count().to_string()
}
