use crate::{builder::Builder, error::ProtoError, parser::parse, tokenizer::tokenize};
use dynaproto_schema::Schema;

/// Compiles IDL text into a resolved, immutable [Schema].
///
/// Runs the full pipeline: tokenize, parse, create the node tree, resolve
/// every type reference, freeze. Multi-file builds that need a shared
/// namespace can drive [Builder] directly instead.
pub fn compile_schema(text: &str) -> Result<Schema, ProtoError> {
    let tokens = tokenize(text)?;
    let file = parse(&tokens)?;
    let mut builder = Builder::new();
    builder.create(&file)?;
    builder.resolve_all()?;
    builder.build()
}
