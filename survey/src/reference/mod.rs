//! Tool reference table: which family ("famille") each tool belongs to.

use std::collections::HashMap;

use crate::error::{InputError, InputResult};
use crate::logs::log_warning;
use crate::models::ReferenceEntry;
use crate::parser::ParseResult;

/// Lookup tables built from the tool reference.
#[derive(Debug, Clone, Default)]
pub struct ToolReference {
    tool_to_category: HashMap<String, String>,
    categories: Vec<String>,
    category_tools: HashMap<String, Vec<String>>,
    other_category: String,
}

impl ToolReference {
    /// Build the lookups from reference rows.
    ///
    /// Blank families map the tool to `other_category` without adding a
    /// category. A tool listed twice keeps its first family.
    pub fn from_entries<I>(entries: I, other_category: &str) -> Self
    where
        I: IntoIterator<Item = ReferenceEntry>,
    {
        let mut reference = Self {
            other_category: other_category.to_string(),
            ..Self::default()
        };

        for entry in entries {
            let tool = entry.tool.trim();
            if tool.is_empty() {
                continue;
            }
            if reference.tool_to_category.contains_key(tool) {
                log_warning(format!("Tool '{}' listed twice in reference, keeping first", tool));
                continue;
            }

            let category = entry.category.trim();
            if category.is_empty() {
                reference
                    .tool_to_category
                    .insert(tool.to_string(), reference.other_category.clone());
                continue;
            }

            reference
                .tool_to_category
                .insert(tool.to_string(), category.to_string());
            if !reference.category_tools.contains_key(category) {
                reference.categories.push(category.to_string());
            }
            reference
                .category_tools
                .entry(category.to_string())
                .or_default()
                .push(tool.to_string());
        }

        reference
    }

    /// Build the lookups from a parsed reference file with `tool` and
    /// `famille` columns. A missing `famille` column reads as blank.
    pub fn from_parsed(parsed: &ParseResult, other_category: &str) -> InputResult<Self> {
        if !parsed.has_column("tool") {
            return Err(InputError::MissingColumn("tool".into()));
        }
        let entries = parsed
            .records
            .iter()
            .map(|row| ReferenceEntry::new(row.get("tool"), row.get("famille")));
        Ok(Self::from_entries(entries, other_category))
    }

    /// Family of `tool`, or the "other" category when unknown.
    pub fn category_of(&self, tool: &str) -> &str {
        self.tool_to_category
            .get(tool)
            .map(String::as_str)
            .unwrap_or(&self.other_category)
    }

    /// Distinct non-blank families, first-seen order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Tools of a family, reference order.
    pub fn tools_in(&self, category: &str) -> &[String] {
        self.category_tools
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn other_category(&self) -> &str {
        &self.other_category
    }

    pub fn len(&self) -> usize {
        self.tool_to_category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_to_category.is_empty()
    }
}
