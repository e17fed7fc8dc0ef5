use std::fmt;

/// A row of the source split into its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Splits `row` on `delimiter`, trimming surrounding whitespace and dropping empty fields.
    pub fn parse(row: &str, delimiter: char) -> Self {
        let fields = row
            .split(delimiter)
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_owned)
            .collect();

        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<String> {
        &mut self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_fields() {
        let record = Record::parse("Paris\t\t Dupont \tJeanne\t", '\t');

        assert_eq!(record.fields(), ["Paris", "Dupont", "Jeanne"]);
        assert_eq!(record.to_string(), "Paris Dupont Jeanne");
    }

    #[test]
    fn parse_empty_row() {
        assert!(Record::parse("", ',').is_empty());
    }
}
