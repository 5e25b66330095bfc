//! Fluent OData query string builder

use super::request::{DatasetKind, RecordLimit};

/// Root of the OData surface behind the local proxy
pub const SERVICE_ROOT: &str = "/odata/";

/// Relations pulled in with every cash-flow download
pub const CASH_FLOW_EXPAND: &str = "FlowCode($select=Code),BudgetCode($select=Code),Account($expand=Master($select=Code);$select=Id),TrnCurrency($select=Id)";

/// Only booked movements are downloaded
pub const CASH_FLOW_FILTER: &str = "Status eq 'Actual'";

/// Builds `<entity set>?$top&$select&$expand&$filter`
///
/// Clauses are emitted in that fixed order no matter the order of the
/// builder calls, and absent clauses are left out entirely.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    entity_set: String,
    top: Option<u32>,
    select: Vec<String>,
    expand: Option<String>,
    filter: Option<String>,
}

impl QueryBuilder {
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            entity_set: entity_set.into(),
            ..Default::default()
        }
    }

    /// Page size; `Unbounded` leaves `$top` out
    pub fn limit(mut self, limit: RecordLimit) -> Self {
        self.top = limit.as_top();
        self
    }

    /// Projection; an empty list leaves `$select` out
    pub fn select<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.select = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn build(self) -> String {
        let mut params = Vec::new();
        if let Some(top) = self.top {
            params.push(format!("$top={}", top));
        }
        if !self.select.is_empty() {
            params.push(format!("$select={}", self.select.join(",")));
        }
        if let Some(expand) = self.expand {
            params.push(format!("$expand={}", expand));
        }
        if let Some(filter) = self.filter {
            params.push(format!("$filter={}", filter));
        }

        let mut endpoint = format!("{}{}", SERVICE_ROOT, self.entity_set);
        if !params.is_empty() {
            endpoint.push('?');
            endpoint.push_str(&params.join("&"));
        }
        endpoint
    }
}

/// Endpoint path for a download of `kind`
///
/// Cash flows always carry the relation expansion and the status filter and
/// honour the field projection; accounts and flow codes only ever get `$top`.
pub fn build_endpoint<S: AsRef<str>>(
    kind: DatasetKind,
    limit: RecordLimit,
    selected_fields: &[S],
) -> String {
    let builder = QueryBuilder::new(kind.entity_set()).limit(limit);
    match kind {
        DatasetKind::CashFlows => builder
            .select(selected_fields)
            .expand(CASH_FLOW_EXPAND)
            .filter(CASH_FLOW_FILTER)
            .build(),
        DatasetKind::Accounts | DatasetKind::FlowCodes => builder.build(),
    }
}
