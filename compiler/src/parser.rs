use std::collections::HashSet;

use crate::{
    ast::{EnumNode, EnumValueNode, FieldNode, MessageNode, ProtoFile},
    error::ProtoError,
    tokenizer::Token,
    utils::{definition_error, quote, unquote},
};
use dynaproto_schema::{Constant, Rule};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:      Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_REF:        Regex = Regex::new(r"^\.?[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").unwrap();
    static ref DOTTED_NAME:     Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").unwrap();
    static ref INTEGER:         Regex = Regex::new(r"^-?(0|[1-9][0-9]*)$").unwrap();
    static ref STRING:          Regex = Regex::new(r#"^""#).unwrap();
    static ref EQUALS:          Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:       Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:           Regex = Regex::new(r"^,$").unwrap();
    static ref LEFT_BRACE:      Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:     Regex = Regex::new(r"^\}$").unwrap();
    static ref OPT_OPEN:        Regex = Regex::new(r"^\[$").unwrap();
    static ref OPT_CLOSE:       Regex = Regex::new(r"^\]$").unwrap();
    static ref PACKAGE_KEYWORD: Regex = Regex::new(r"^package$").unwrap();
    static ref OPTION_KEYWORD:  Regex = Regex::new(r"^option$").unwrap();
    static ref MESSAGE_KEYWORD: Regex = Regex::new(r"^message$").unwrap();
    static ref ENUM_KEYWORD:    Regex = Regex::new(r"^enum$").unwrap();
    static ref RULE_KEYWORD:    Regex = Regex::new(r"^(required|optional|repeated)$").unwrap();
    static ref EOF:             Regex = Regex::new(r"^$").unwrap();
}

/// Field ids must fit the 29 bits left in a tag and stay outside the range
/// the protobuf spec reserves for its own use.
const MAX_FIELD_ID: i64 = (1 << 29) - 1;
const RESERVED_ID_RANGE: std::ops::RangeInclusive<i64> = 19000..=19999;

fn current_token<'a>(tokens: &'a [Token], index: usize) -> &'a Token {
    // The EOF token is never consumed, so the index stays in bounds.
    &tokens[index.min(tokens.len() - 1)]
}

fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> bool {
    if test.is_match(&current_token(tokens, *index).text) {
        *index += 1;
        true
    } else {
        false
    }
}

fn expect(tokens: &[Token], index: &mut usize, test: &Regex, expected: &str) -> Result<(), ProtoError> {
    if !eat(tokens, index, test) {
        let tok = current_token(tokens, *index);
        return Err(ProtoError::Syntax {
            msg:    format!("Expected {} but found {}", expected, quote(&tok.text)),
            line:   tok.line,
            column: tok.column,
        });
    }
    Ok(())
}

fn unexpected_token(tokens: &[Token], index: usize) -> ProtoError {
    let tok = current_token(tokens, index);
    ProtoError::Syntax {
        msg:    format!("Unexpected token {}", quote(&tok.text)),
        line:   tok.line,
        column: tok.column,
    }
}

/// Parses a token stream into a [ProtoFile]. Type references stay textual;
/// duplicate names and ids within a single scope are rejected here, before
/// the builder ever sees them.
pub fn parse(tokens: &[Token]) -> Result<ProtoFile, ProtoError> {
    let mut index = 0;
    let mut file = ProtoFile {
        package:  None,
        options:  Vec::new(),
        messages: Vec::new(),
        enums:    Vec::new(),
    };
    let mut scope_names = HashSet::new();

    // Handle package declaration
    if eat(tokens, &mut index, &PACKAGE_KEYWORD) {
        let pkg_tok = current_token(tokens, index);
        expect(tokens, &mut index, &DOTTED_NAME, "package name")?;
        file.package = Some(pkg_tok.text.clone());
        expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
    }

    while !eat(tokens, &mut index, &EOF) {
        if eat(tokens, &mut index, &OPTION_KEYWORD) {
            file.options.push(parse_option(tokens, &mut index)?);
        } else if eat(tokens, &mut index, &MESSAGE_KEYWORD) {
            let message = parse_message(tokens, &mut index)?;
            claim_name(&mut scope_names, &message.name, message.line, message.column)?;
            file.messages.push(message);
        } else if eat(tokens, &mut index, &ENUM_KEYWORD) {
            let decl = parse_enum(tokens, &mut index)?;
            claim_name(&mut scope_names, &decl.name, decl.line, decl.column)?;
            file.enums.push(decl);
        } else {
            return Err(unexpected_token(tokens, index));
        }
    }

    Ok(file)
}

fn claim_name(
    names: &mut HashSet<String>,
    name: &str,
    line: usize,
    column: usize,
) -> Result<(), ProtoError> {
    if !names.insert(name.to_owned()) {
        return Err(definition_error(
            &format!("The name {} is defined twice in this scope", quote(name)),
            line,
            column,
        ));
    }
    Ok(())
}

/// Parses a message body; the `message` keyword has already been consumed.
fn parse_message(tokens: &[Token], index: &mut usize) -> Result<MessageNode, ProtoError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "message name")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut message = MessageNode {
        name,
        line,
        column,
        fields:   Vec::new(),
        messages: Vec::new(),
        enums:    Vec::new(),
        options:  Vec::new(),
    };
    let mut scope_names = HashSet::new();
    let mut field_names = HashSet::new();
    let mut field_ids = HashSet::new();

    while !eat(tokens, index, &RIGHT_BRACE) {
        if eat(tokens, index, &OPTION_KEYWORD) {
            message.options.push(parse_option(tokens, index)?);
        } else if eat(tokens, index, &MESSAGE_KEYWORD) {
            let nested = parse_message(tokens, index)?;
            claim_name(&mut scope_names, &nested.name, nested.line, nested.column)?;
            message.messages.push(nested);
        } else if eat(tokens, index, &ENUM_KEYWORD) {
            let nested = parse_enum(tokens, index)?;
            claim_name(&mut scope_names, &nested.name, nested.line, nested.column)?;
            message.enums.push(nested);
        } else if RULE_KEYWORD.is_match(&current_token(tokens, *index).text) {
            let field = parse_field(tokens, index)?;
            if !field_names.insert(field.name.clone()) {
                return Err(definition_error(
                    &format!(
                        "Duplicate field name {} in message {}",
                        quote(&field.name),
                        quote(&message.name)
                    ),
                    field.line,
                    field.column,
                ));
            }
            if !field_ids.insert(field.id) {
                return Err(definition_error(
                    &format!(
                        "Duplicate field id {} in message {}",
                        field.id,
                        quote(&message.name)
                    ),
                    field.line,
                    field.column,
                ));
            }
            message.fields.push(field);
        } else {
            return Err(unexpected_token(tokens, *index));
        }
    }

    Ok(message)
}

/// Parses one field declaration, starting at the rule keyword.
fn parse_field(tokens: &[Token], index: &mut usize) -> Result<FieldNode, ProtoError> {
    let rule_tok = current_token(tokens, *index);
    let rule = match rule_tok.text.as_str() {
        "required" => Rule::Required,
        "optional" => Rule::Optional,
        _ => Rule::Repeated,
    };
    *index += 1;

    let type_tok = current_token(tokens, *index);
    let type_ref = type_tok.text.clone();
    expect(tokens, index, &TYPE_REF, "type name")?;

    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "field name")?;
    expect(tokens, index, &EQUALS, "\"=\"")?;

    let id_tok = current_token(tokens, *index);
    expect(tokens, index, &INTEGER, "field id")?;
    let id = id_tok
        .text
        .parse::<i64>()
        .map_err(|_| definition_error("Field id does not fit 64 bits", id_tok.line, id_tok.column))?;
    if id <= 0 {
        return Err(definition_error(
            &format!("Field id for {} must be positive", quote(&name)),
            id_tok.line,
            id_tok.column,
        ));
    }
    if id > MAX_FIELD_ID {
        return Err(definition_error(
            &format!("Field id for {} exceeds the 29-bit maximum", quote(&name)),
            id_tok.line,
            id_tok.column,
        ));
    }
    if RESERVED_ID_RANGE.contains(&id) {
        return Err(definition_error(
            &format!("Field id for {} falls in the reserved range 19000-19999", quote(&name)),
            id_tok.line,
            id_tok.column,
        ));
    }

    let mut options = Vec::new();
    if eat(tokens, index, &OPT_OPEN) {
        loop {
            let key_tok = current_token(tokens, *index);
            let key = key_tok.text.clone();
            expect(tokens, index, &IDENTIFIER, "option name")?;
            expect(tokens, index, &EQUALS, "\"=\"")?;
            options.push((key, parse_constant(tokens, index)?));
            if !eat(tokens, index, &COMMA) {
                break;
            }
        }
        expect(tokens, index, &OPT_CLOSE, "\"]\"")?;
    }
    expect(tokens, index, &SEMICOLON, "\";\"")?;

    Ok(FieldNode {
        name,
        line,
        column,
        rule,
        type_ref,
        id: id as u32,
        options,
    })
}

/// Parses an enum body; the `enum` keyword has already been consumed.
fn parse_enum(tokens: &[Token], index: &mut usize) -> Result<EnumNode, ProtoError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "enum name")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut decl = EnumNode {
        name,
        line,
        column,
        values: Vec::new(),
    };
    let mut value_names = HashSet::new();
    let mut value_numbers = HashSet::new();

    while !eat(tokens, index, &RIGHT_BRACE) {
        let value_tok = current_token(tokens, *index);
        let (value_name, value_line, value_column) =
            (value_tok.text.clone(), value_tok.line, value_tok.column);
        expect(tokens, index, &IDENTIFIER, "enum value name")?;
        expect(tokens, index, &EQUALS, "\"=\"")?;

        let number_tok = current_token(tokens, *index);
        expect(tokens, index, &INTEGER, "enum value number")?;
        let number = number_tok.text.parse::<i32>().map_err(|_| {
            definition_error(
                &format!("Enum value {} does not fit 32 bits", quote(&value_name)),
                number_tok.line,
                number_tok.column,
            )
        })?;
        expect(tokens, index, &SEMICOLON, "\";\"")?;

        if !value_names.insert(value_name.clone()) {
            return Err(definition_error(
                &format!(
                    "Duplicate value name {} in enum {}",
                    quote(&value_name),
                    quote(&decl.name)
                ),
                value_line,
                value_column,
            ));
        }
        if !value_numbers.insert(number) {
            return Err(definition_error(
                &format!("Duplicate value {} in enum {}", number, quote(&decl.name)),
                value_line,
                value_column,
            ));
        }

        decl.values.push(EnumValueNode {
            name:   value_name,
            line:   value_line,
            column: value_column,
            number,
        });
    }

    Ok(decl)
}

/// Parses `NAME = constant ;` after the `option` keyword.
fn parse_option(tokens: &[Token], index: &mut usize) -> Result<(String, Constant), ProtoError> {
    let name_tok = current_token(tokens, *index);
    let name = name_tok.text.clone();
    expect(tokens, index, &IDENTIFIER, "option name")?;
    expect(tokens, index, &EQUALS, "\"=\"")?;
    let value = parse_constant(tokens, index)?;
    expect(tokens, index, &SEMICOLON, "\";\"")?;
    Ok((name, value))
}

fn parse_constant(tokens: &[Token], index: &mut usize) -> Result<Constant, ProtoError> {
    let tok = current_token(tokens, *index);
    if INTEGER.is_match(&tok.text) {
        let value = tok
            .text
            .parse::<i64>()
            .map_err(|_| definition_error("Integer constant does not fit 64 bits", tok.line, tok.column))?;
        *index += 1;
        Ok(Constant::Int(value))
    } else if STRING.is_match(&tok.text) {
        let value = unquote(&tok.text);
        *index += 1;
        Ok(Constant::Str(value))
    } else if IDENTIFIER.is_match(&tok.text) {
        let value = tok.text.clone();
        *index += 1;
        Ok(Constant::Word(value))
    } else {
        Err(unexpected_token(tokens, *index))
    }
}
