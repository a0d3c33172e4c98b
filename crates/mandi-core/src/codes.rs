//! # Customer Codes
//!
//! Hotel customers appear on master sheets under short codes ("OMX" for
//! Omex, "C&C" for Cellar and Cup). Bills carry the full name. This table
//! bridges the two when a sheet column is matched to a bill's customer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::normalize_key;

/// Full-name → code pairs used when no configuration overrides them.
pub const DEFAULT_CUSTOMER_CODES: &[(&str, &str)] = &[
    ("Omex", "OMX"),
    ("Latango", "LAT"),
    ("Latango Bar", "LAT_B"),
    ("Japanico", "JAP"),
    ("Japanico Bar", "JAP_B"),
    ("Perch", "PER"),
    ("Perch Bar", "PER_B"),
    ("Carnatic Cafe", "CC"),
    ("Refuge", "REF"),
    ("Korner 27", "TRE"),
    ("Manam", "MAN"),
    ("Cellar and Cup", "C&C"),
    ("KaliGhata", "KAG"),
    ("KaliGhata 2", "KAG2"),
    ("Behind the Bar", "BTB"),
];

/// Sheet column labels are compared in this form.
pub fn column_label_key(label: &str) -> String {
    label.trim().to_uppercase()
}

/// Bidirectional customer name ↔ code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CustomerCodes {
    /// (full name, code) in display form.
    entries: Vec<(String, String)>,
}

impl Default for CustomerCodes {
    fn default() -> Self {
        CustomerCodes::from_pairs(
            DEFAULT_CUSTOMER_CODES
                .iter()
                .map(|(name, code)| (name.to_string(), code.to_string())),
        )
    }
}

impl CustomerCodes {
    /// Builds a table from (full name, code) pairs. Blank pairs are dropped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(name, code)| (name.trim().to_string(), column_label_key(&code)))
            .filter(|(name, code)| !name.is_empty() && !code.is_empty())
            .collect();
        CustomerCodes { entries }
    }

    /// An empty table (every customer is its own code).
    pub fn empty() -> Self {
        CustomerCodes {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The code for a customer: its mapped code, else its uppercased name.
    ///
    /// ```rust
    /// use mandi_core::codes::CustomerCodes;
    ///
    /// let codes = CustomerCodes::default();
    /// assert_eq!(codes.code_for("carnatic cafe"), "CC");
    /// assert_eq!(codes.code_for("New Hotel"), "NEW HOTEL");
    /// ```
    pub fn code_for(&self, customer_name: &str) -> String {
        let key = normalize_key(customer_name);
        self.entries
            .iter()
            .find(|(name, _)| normalize_key(name) == key)
            .map(|(_, code)| code.clone())
            .unwrap_or_else(|| column_label_key(customer_name))
    }

    /// The full customer name for a code, if the code is known.
    pub fn name_for(&self, code: &str) -> Option<&str> {
        let key = column_label_key(code);
        self.entries
            .iter()
            .find(|(_, c)| *c == key)
            .map(|(name, _)| name.as_str())
    }

    /// Labels to try, in order, when matching `label` to a sheet column.
    ///
    /// The label itself comes first, then its abbreviation code, then (when
    /// the label is itself a code) the full name it abbreviates.
    pub fn candidates(&self, label: &str) -> Vec<String> {
        let mut out = vec![column_label_key(label)];
        let code = self.code_for(label);
        if !out.contains(&code) {
            out.push(code);
        }
        if let Some(name) = self.name_for(label) {
            let name = column_label_key(name);
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

impl From<BTreeMap<String, String>> for CustomerCodes {
    fn from(map: BTreeMap<String, String>) -> Self {
        CustomerCodes::from_pairs(map)
    }
}

impl From<CustomerCodes> for BTreeMap<String, String> {
    fn from(codes: CustomerCodes) -> Self {
        codes.entries.into_iter().collect()
    }
}
