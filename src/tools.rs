use std::fmt;
use std::str::FromStr;

use crate::schema::RequiredSchema;
use crate::{IngestError, IngestResult};

/// Calculators that accept CSV uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ProductResearch,
    Profit,
    Acos,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::ProductResearch, Tool::Profit, Tool::Acos];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ProductResearch => "product-research",
            Tool::Profit => "profit",
            Tool::Acos => "acos",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Tool::ProductResearch => &[
                "asin",
                "price",
                "reviews",
                "rating",
                "conversion_rate",
                "click_through_rate",
                "brands",
                "keywords",
                "niche",
            ],
            Tool::Profit => &["asin", "price", "cost", "fees"],
            Tool::Acos => &["campaign", "ad_spend", "ad_sales"],
        }
    }

    pub fn numeric_columns(self) -> &'static [&'static str] {
        match self {
            Tool::ProductResearch => &[
                "price",
                "reviews",
                "rating",
                "conversion_rate",
                "click_through_rate",
            ],
            Tool::Profit => &["price", "cost", "fees"],
            Tool::Acos => &["ad_spend", "ad_sales"],
        }
    }

    pub fn schema(self) -> IngestResult<RequiredSchema> {
        Ok(RequiredSchema::new(self.columns().iter().copied())?
            .with_numeric(self.numeric_columns().iter().copied()))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| IngestError::InvalidSchema(format!("unknown tool '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_schemas_are_valid() {
        for tool in Tool::ALL {
            let schema = tool.schema().unwrap();
            assert_eq!(schema.columns().len(), tool.columns().len());
            for n in tool.numeric_columns() {
                assert!(schema.position(n).is_some(), "{tool}: {n}");
            }
        }
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("acos".parse::<Tool>().unwrap(), Tool::Acos);
        assert!("ppc".parse::<Tool>().is_err());
    }
}
