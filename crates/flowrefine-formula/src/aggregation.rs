//! Summarize aggregation conversion

use crate::registry::Template;

/// Trino form of a Summarize action. Plain names are wrapped as `NAME(field)`.
fn aggregate(action: &str) -> Option<&'static str> {
    Some(match action {
        "Sum" => "SUM",
        "Count" => "COUNT",
        "CountDistinct" => "COUNT(DISTINCT {0})",
        "CountNonNull" => "COUNT",
        "CountNull" => "SUM(CASE WHEN {0} IS NULL THEN 1 ELSE 0 END)",
        "CountBlank" => "SUM(CASE WHEN {0} = '' THEN 1 ELSE 0 END)",
        "Min" => "MIN",
        "Max" => "MAX",
        "Avg" => "AVG",
        "First" => "FIRST_VALUE({0}) OVER ()",
        "Last" => "LAST_VALUE({0}) OVER ()",
        "Concat" => "LISTAGG({0}, ',')",
        "Mode" => "APPROX_MOST_FREQUENT({0}, 1)",
        "StdDev" => "STDDEV",
        "StdDevP" => "STDDEV_POP",
        "Variance" => "VARIANCE",
        "VarianceP" => "VAR_POP",
        "Median" => "APPROX_PERCENTILE({0}, 0.5)",
        "Percentile" => "APPROX_PERCENTILE({0}, {1})",
        _ => return None,
    })
}

/// Convert a Summarize action applied to `field` into a Trino aggregate.
///
/// `extra` carries additional arguments such as a percentile value. When a
/// template needs more arguments than were supplied, the function name is
/// applied to the field alone. Unknown actions produce a TODO marker.
pub fn convert_aggregation(action: &str, field: &str, extra: &[&str]) -> String {
    let Some(mapping) = aggregate(action) else {
        return format!("/* TODO: {} */ {}", action, field);
    };

    if !mapping.contains('{') {
        return format!("{}({})", mapping, field);
    }

    let args: Vec<String> = std::iter::once(field)
        .chain(extra.iter().copied())
        .map(str::to_string)
        .collect();

    Template::parse(mapping).render(&args).unwrap_or_else(|| {
        let name = mapping.split('(').next().unwrap_or(mapping);
        format!("{}({})", name, field)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_aggregates() {
        assert_eq!(convert_aggregation("Sum", "\"Amount\"", &[]), "SUM(\"Amount\")");
        assert_eq!(convert_aggregation("VarianceP", "x", &[]), "VAR_POP(x)");
    }

    #[test]
    fn templated_aggregates() {
        assert_eq!(convert_aggregation("CountDistinct", "id", &[]), "COUNT(DISTINCT id)");
        assert_eq!(
            convert_aggregation("CountNull", "x", &[]),
            "SUM(CASE WHEN x IS NULL THEN 1 ELSE 0 END)"
        );
        assert_eq!(convert_aggregation("Percentile", "x", &["0.9"]), "APPROX_PERCENTILE(x, 0.9)");
    }

    #[test]
    fn missing_extra_argument_falls_back() {
        assert_eq!(convert_aggregation("Percentile", "x", &[]), "APPROX_PERCENTILE(x)");
    }

    #[test]
    fn unknown_action() {
        assert_eq!(convert_aggregation("GroupBy", "Region", &[]), "/* TODO: GroupBy */ Region");
    }
}
