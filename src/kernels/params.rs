//! Declarative description of a kernel, as used to build pipelines.
//!
//! A [KernelSpec] is a name and a map of constructor parameters. In json the parameters sit next to the name:
//! `{"name": "weisfeiler_lehman", "n_iter": 5}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GraphKernelError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl KernelSpec {
    /// a spec without parameters
    pub fn new(name: &str) -> Self {
        KernelSpec {
            name: name.to_string(),
            params: Map::new(),
        }
    }

    /// adds a parameter, builder style
    pub fn with<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// decodes parameters in a kernel parameter struct
    pub fn decode<P: DeserializeOwned>(&self) -> Result<P> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| GraphKernelError::InvalidParameter {
            kernel: self.name.clone(),
            reason: e.to_string(),
        })
    }

    /// parses a spec, or a list of specs, from a json string
    pub fn from_json(json: &str) -> Result<Vec<KernelSpec>> {
        let value: Value = serde_json::from_str(json).map_err(|e| GraphKernelError::InvalidPipeline(e.to_string()))?;
        let specs = match value {
            Value::Array(_) => serde_json::from_value::<Vec<KernelSpec>>(value),
            _ => serde_json::from_value::<KernelSpec>(value).map(|spec| vec![spec]),
        };
        specs.map_err(|e| GraphKernelError::InvalidPipeline(e.to_string()))
    }
} // end of impl KernelSpec

impl From<&str> for KernelSpec {
    fn from(name: &str) -> Self {
        KernelSpec::new(name)
    }
}

// a single spec is a pipeline made of one base kernel
impl From<KernelSpec> for Vec<KernelSpec> {
    fn from(spec: KernelSpec) -> Self {
        vec![spec]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct TestParams {
        n_iter: usize,
    }

    impl Default for TestParams {
        fn default() -> Self {
            TestParams { n_iter: 5 }
        }
    }

    #[test]
    fn json_flattening() {
        let specs = KernelSpec::from_json(r#"[{"name": "WL", "n_iter": 3}, {"name": "subtree_wl"}]"#).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0], KernelSpec::new("WL").with("n_iter", 3));
        let params: TestParams = specs[0].decode().unwrap();
        assert_eq!(params.n_iter, 3);
        let params: TestParams = specs[1].decode().unwrap();
        assert_eq!(params.n_iter, 5);
        //
        let single = KernelSpec::from_json(r#"{"name": "shortest_path", "with_labels": false}"#).unwrap();
        assert_eq!(single.len(), 1);
        let json = serde_json::to_string(&single[0]).unwrap();
        assert!(json.contains("\"with_labels\":false"));
    }

    #[test]
    fn decode_errors() {
        let spec = KernelSpec::new("WL").with("n_iterations", 3);
        let res: Result<TestParams> = spec.decode();
        assert!(matches!(res, Err(GraphKernelError::InvalidParameter { .. })));
        let spec = KernelSpec::new("WL").with("n_iter", "three");
        let res: Result<TestParams> = spec.decode();
        assert!(matches!(res, Err(GraphKernelError::InvalidParameter { .. })));
        assert!(KernelSpec::from_json("[{\"n_iter\": 3}]").is_err());
    }
} // end of mod tests
