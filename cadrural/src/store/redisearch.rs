//! RediSearch commands used by [`RedisStore`](super::RedisStore) and decoding of their replies.

use log::info;
use redis::{Cmd, Value, aio::ConnectionManager, cmd};
use serde_json::{Map, Value as JsonValue};

use crate::{
    errors::RepoError,
    search::{IndexField, SortOrder},
};

/// `RETURN 1 $` needs dialect 3.
const DOCUMENT_DIALECT: u64 = 3;

/// One collection index over RedisJSON keys sharing a prefix.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub prefix: String,
    pub schema: Vec<IndexField>,
}

impl IndexDefinition {
    fn create_command(&self) -> Cmd {
        let mut command = cmd("FT.CREATE");
        command.arg(&self.name);
        for word in ["ON", "JSON", "PREFIX", "1"] {
            command.arg(word);
        }
        command.arg(&self.prefix);
        for word in ["STOPWORDS", "0", "SCHEMA"] {
            command.arg(word);
        }
        for field in &self.schema {
            command.arg(&field.path).arg("AS").arg(&field.field_name);
            for word in field.field_type.schema_args() {
                command.arg(*word);
            }
            if field.sortable {
                command.arg("SORTABLE");
            }
        }
        command
    }
}

/// Creates the index unless one with that name is already listed.
pub async fn ensure_index(conn: &mut ConnectionManager, definition: &IndexDefinition) -> Result<(), RepoError> {
    let existing: Vec<String> = cmd("FT._LIST").query_async(conn).await?;
    if existing.contains(&definition.name) {
        return Ok(());
    }
    match definition.create_command().query_async::<()>(conn).await {
        Ok(()) => {
            info!("created search index {}", definition.name);
            Ok(())
        }
        // Created by another process after FT._LIST ran.
        Err(err) if err.to_string().to_ascii_lowercase().contains("already exists") => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Total hits and the documents of one `FT.SEARCH` page.
pub async fn search_page(
    conn: &mut ConnectionManager,
    index: &str,
    query: &str,
    sort: Option<(&str, SortOrder)>,
    offset: u64,
    count: u64,
) -> Result<(u64, Vec<JsonValue>), RepoError> {
    let mut command = cmd("FT.SEARCH");
    command.arg(index).arg(query);
    if let Some((field, order)) = sort {
        command.arg("SORTBY").arg(field).arg(order.as_str());
    }
    command.arg("LIMIT").arg(offset).arg(count);
    command.arg("RETURN").arg(1).arg("$");
    command.arg("DIALECT").arg(DOCUMENT_DIALECT);

    let (total, entries) = split_reply(command.query_async(conn).await?)?;
    let documents = entries
        .chunks_exact(2)
        .map(|entry| document(&entry[1]))
        .collect::<Result<_, _>>()?;
    Ok((total, documents))
}

/// Splits an `FT.SEARCH` or `FT.AGGREGATE` reply into its leading count and the rest.
pub fn split_reply(raw: Value) -> Result<(u64, Vec<Value>), RepoError> {
    let mut entries = match raw {
        Value::Array(entries) | Value::Set(entries) => entries,
        Value::Nil => Vec::new(),
        other => return Err(RepoError::other(format!("unexpected search reply: {other:?}"))),
    };
    if entries.is_empty() {
        return Ok((0, entries));
    }
    let total = reply_count(&entries.remove(0))?;
    Ok((total, entries))
}

fn reply_count(value: &Value) -> Result<u64, RepoError> {
    let count = match value {
        Value::Int(n) => u64::try_from(*n).ok(),
        other => reply_text(other).ok().and_then(|text| text.parse().ok()),
    };
    count.ok_or_else(|| RepoError::other(format!("invalid count in search reply: {value:?}")))
}

/// Scalar reply value as text.
pub fn reply_text(value: &Value) -> Result<String, RepoError> {
    match value {
        Value::BulkString(bytes) => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|err| RepoError::other(format!("search reply is not UTF-8: {err}"))),
        Value::SimpleString(text) | Value::VerbatimString { text, .. } => Ok(text.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Double(n) => Ok(n.to_string()),
        Value::Boolean(flag) => Ok(flag.to_string()),
        other => Err(RepoError::other(format!("unexpected value in search reply: {other:?}"))),
    }
}

/// `field, value` pairs of an `FT.AGGREGATE` row or of the fields `RETURN` picked.
/// Missing values become null.
pub fn field_pairs(row: &Value) -> Result<Map<String, JsonValue>, RepoError> {
    let mut fields = Map::new();
    let Value::Array(pairs) = row else {
        return Ok(fields);
    };
    for pair in pairs.chunks_exact(2) {
        let value = match &pair[1] {
            Value::Nil => JsonValue::Null,
            other => JsonValue::String(reply_text(other)?),
        };
        fields.insert(reply_text(&pair[0])?, value);
    }
    Ok(fields)
}

/// The `$` payload of a returned document.
fn document(fields: &Value) -> Result<JsonValue, RepoError> {
    let payload = match fields {
        Value::Array(pairs) => {
            let pair = pairs
                .chunks_exact(2)
                .find(|pair| matches!(reply_text(&pair[0]).as_deref(), Ok("$")))
                .ok_or_else(|| RepoError::other("search reply has no JSON payload"))?;
            reply_text(&pair[1])?
        }
        other => reply_text(other)?,
    };
    // Dialect 3 returns JSONPath results wrapped in an array.
    Ok(match serde_json::from_str(&payload)? {
        JsonValue::Array(matches) => matches.into_iter().next().unwrap_or(JsonValue::Null),
        value => value,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::search::{FieldIndex, IndexFieldType, IndexedField, index_schema};

    fn bulk(text: &str) -> Value {
        Value::BulkString(text.as_bytes().to_vec())
    }

    #[test]
    fn create_command_lists_every_schema_field() {
        let definition = IndexDefinition {
            name: "cad:produtores:idx".into(),
            prefix: "cad:produtores:".into(),
            schema: index_schema(&[IndexedField::new("uf", FieldIndex::Tag), IndexedField::new("nome", FieldIndex::Text)]),
        };
        let packed = String::from_utf8_lossy(&definition.create_command().get_packed_command()).into_owned();
        for word in ["FT.CREATE", "PREFIX", "cad:produtores:", "$._norm.nome", "nome_norm", "CASESENSITIVE", "SORTABLE"] {
            assert!(packed.contains(word), "{word} missing from {packed}");
        }
        assert_eq!(IndexFieldType::Numeric.schema_args(), &["NUMERIC"]);
    }

    #[test]
    fn split_reply_takes_the_leading_count() {
        let (total, rest) = split_reply(Value::Array(vec![bulk("2"), bulk("a"), bulk("b")])).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rest.len(), 2);

        let (total, rest) = split_reply(Value::Array(vec![Value::Int(0)])).unwrap();
        assert_eq!((total, rest.len()), (0, 0));
        assert!(split_reply(Value::Int(3)).is_err());
    }

    #[test]
    fn documents_are_unwrapped_from_the_jsonpath_array() {
        let fields = Value::Array(vec![bulk("$"), bulk(r#"[{"nome":"Ana"}]"#)]);
        assert_eq!(document(&fields).unwrap(), json!({"nome": "Ana"}));
        assert!(document(&Value::Array(vec![bulk("nome"), bulk("Ana")])).is_err());
    }

    #[test]
    fn field_pairs_keep_nulls() {
        let row = Value::Array(vec![bulk("uf"), bulk("SP"), bulk("total"), Value::Nil]);
        let fields = field_pairs(&row).unwrap();
        assert_eq!(fields["uf"], json!("SP"));
        assert_eq!(fields["total"], JsonValue::Null);
    }
}
