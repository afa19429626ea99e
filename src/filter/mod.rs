pub const CREATE_CONFIG_METADATA: &str =
    "type.googleapis.com/google.spanner.admin.instance.v1.CreateInstanceConfigMetadata";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub path: String,
    pub op: Operator,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Has,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotFilterableReason {
    EmptyPath,
    UnsafePath,
    UnsafeValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterDiagnostic {
    pub path: String,
    pub reason: NotFilterableReason,
}

impl Clause {
    pub fn eq(
        path: &str,
        value: &str,
    ) -> Self {
        Self {
            path: path.to_string(),
            op: Operator::Eq,
            value: value.to_string(),
        }
    }

    pub fn has(
        path: &str,
        value: &str,
    ) -> Self {
        Self {
            path: path.to_string(),
            op: Operator::Has,
            value: value.to_string(),
        }
    }
}

/// Operations created for the named custom config.
pub fn create_operations_for(config_id: &str) -> Result<String, FilterDiagnostic> {
    build_filter(&[
        Clause::eq("metadata.@type", CREATE_CONFIG_METADATA),
        Clause::has("metadata.instance_config.name", config_id),
    ])
}

/// Joins clauses as `(a=b) AND (c:d)`, refusing anything that could change the
/// meaning of the server-side expression.
pub fn build_filter(clauses: &[Clause]) -> Result<String, FilterDiagnostic> {
    let mut parts = Vec::with_capacity(clauses.len());
    for clause in clauses {
        parts.push(format!("({})", render_clause(clause)?));
    }
    Ok(parts.join(" AND "))
}

fn render_clause(clause: &Clause) -> Result<String, FilterDiagnostic> {
    let diagnostic = |reason| FilterDiagnostic {
        path: clause.path.clone(),
        reason,
    };

    if clause.path.is_empty() {
        return Err(diagnostic(NotFilterableReason::EmptyPath));
    }
    if !is_path_safe(&clause.path) {
        return Err(diagnostic(NotFilterableReason::UnsafePath));
    }
    if !is_value_safe(&clause.value) {
        return Err(diagnostic(NotFilterableReason::UnsafeValue));
    }

    let operator = match clause.op {
        Operator::Eq => "=",
        Operator::Has => ":",
    };
    Ok(format!("{}{operator}{}", clause.path, clause.value))
}

fn is_path_safe(path: &str) -> bool {
    path.chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '@'))
}

fn is_value_safe(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '\'' | '=' | ':' | '<' | '>' | '!'))
}
