//! Schema values: the structured, serializable record type that flows along
//! workflow edges, plus the recursive record ↔ JSON mapping.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record type that can flow through a workflow as a step's input or
/// output.
///
/// Any type deriving `Serialize`/`Deserialize` automatically qualifies via
/// the blanket impl below; `schema_name` supplies the nominal tag used by
/// the agent executor's schema check.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static {
    /// The declared schema name for this record type, e.g. `"TextValue"`.
    /// Defaults to the Rust type name, which is usually what a hand-written
    /// agent wants; override it if a stable name independent of module path
    /// is required.
    fn schema_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A structured value tagged with the schema name of the record that
/// produced it. This is the universal serializable value carrier that lets
/// a single `HashMap<String, Box<dyn StepExecutor>>` carry
/// heterogeneously-typed agent outputs along DAG edges without every step
/// knowing every other step's concrete Rust type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaValue {
    pub schema_name: String,
    pub payload: serde_json::Value,
}

impl SchemaValue {
    /// Serialize a record into a tagged schema value.
    pub fn from_record<R: Record>(record: &R) -> crate::Result<Self> {
        let payload = serde_json::to_value(record)?;
        Ok(Self {
            schema_name: R::schema_name().to_string(),
            payload,
        })
    }

    /// Attempt to deserialize this value as the given record type.
    ///
    /// Performs both the nominal check (schema name tag matches) and the
    /// structural check (the JSON payload actually deserializes into `R`) —
    /// either mismatch is reported as the same "not an instance of"
    /// condition, since a host language with reflection would not
    /// distinguish them either.
    pub fn as_record<R: Record>(&self) -> Option<R> {
        if self.schema_name != R::schema_name() {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }

    /// The schema name this value is tagged with, for error messages.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }
}

/// Synthetic input fed to a step with two or more upstreams: a mapping from
/// upstream step name to that step's tagged output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedInput {
    pub outputs: HashMap<String, SchemaValue>,
}

impl Record for MergedInput {
    fn schema_name() -> &'static str {
        "MergedInput"
    }
}
