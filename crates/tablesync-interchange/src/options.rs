//! Options shared by CSV export and import

/// How imported CSV fields are turned into values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueInference {
    /// Every field stays `Value::String`, empty fields included
    #[default]
    Text,
    /// Empty fields become `Null`; booleans, integers and decimals are parsed
    Infer,
}

/// CSV dialect and import policy
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter byte, `,` by default
    pub delimiter: u8,
    /// Write a header row on export. Import always reads one.
    pub include_headers: bool,
    /// Value policy for import
    pub inference: ValueInference,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_headers: true,
            inference: ValueInference::Text,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, include_headers: bool) -> Self {
        self.include_headers = include_headers;
        self
    }

    pub fn with_inference(mut self, inference: ValueInference) -> Self {
        self.inference = inference;
        self
    }
}
