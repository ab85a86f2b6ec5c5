//! Next-module prediction from a fixed transition table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps each module to the modules most likely to be opened after it.
///
/// Lookups for an unknown module, or with no history at all, fall back to
/// `fallback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// Candidates used when the last module has no entry.
    #[serde(default)]
    pub fallback: Vec<String>,
    /// Ordered follow-up candidates per module.
    #[serde(default)]
    pub next: HashMap<String, Vec<String>>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("caja", &["ventas", "creditos", "inventario"]),
            ("ventas", &["caja", "reportes", "clientes"]),
            ("creditos", &["pagos", "clientes", "caja"]),
            ("pagos", &["creditos", "caja"]),
            ("clientes", &["creditos", "ventas"]),
            ("inventario", &["proveedores", "ventas", "caja"]),
            ("proveedores", &["inventario", "notas"]),
            ("notas", &["proveedores", "configuracion"]),
            ("reportes", &["ventas", "inventario"]),
            ("configuracion", &["caja", "notas"]),
        ];

        Self {
            fallback: to_strings(&["caja", "ventas", "inventario"]),
            next: table.iter().map(|(module, next)| ((*module).to_string(), to_strings(next))).collect(),
        }
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

impl TransitionTable {
    /// Candidates following `last`, in likelihood order.
    #[must_use]
    pub fn candidates(&self, last: Option<&str>) -> &[String] {
        last.and_then(|module| self.next.get(module)).map_or(self.fallback.as_slice(), Vec::as_slice)
    }

    /// Up to `limit` candidates following `last` for which `skip` returns `false`.
    pub fn predict<F>(&self, last: Option<&str>, limit: usize, skip: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.candidates(last).iter().filter(|module| !skip(module)).take(limit).cloned().collect()
    }
}
