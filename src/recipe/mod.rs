//! Text recipes for chart specs.
//!
//! ```text
//! barh(sum(revenue) by product) | top(10)
//! line(mean(revenue) by weekday, subcategory) | title("曜日とサブカテゴリ")
//! scatter(revenue by temperature)
//! ```

pub mod ast;
pub mod lexer;
pub mod parse;

use crate::chart::{ChartKind, ChartSpec, Dimension, Measure, Order, Reduction};
use ast::Modifier;

pub use parse::parse_raw_recipe;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecipeError {
    #[error("syntax error near '{0}'")]
    Syntax(String),

    #[error("unknown chart kind '{0}'")]
    UnknownKind(String),

    #[error("unknown reduction '{0}'")]
    UnknownReduction(String),

    #[error("unknown measure '{0}'")]
    UnknownMeasure(String),

    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("unknown order '{0}'")]
    UnknownOrder(String),

    #[error("{0}")]
    Invalid(String),
}

fn parse_kind(name: &str) -> Result<ChartKind, RecipeError> {
    match name {
        "bar" => Ok(ChartKind::Bar),
        "barh" => Ok(ChartKind::HorizontalBar),
        "pie" => Ok(ChartKind::Pie),
        "scatter" => Ok(ChartKind::Scatter),
        "line" => Ok(ChartKind::Line),
        other => Err(RecipeError::UnknownKind(other.to_string())),
    }
}

fn parse_reduction(name: Option<&str>) -> Result<Reduction, RecipeError> {
    match name {
        None => Ok(Reduction::None),
        Some("sum") => Ok(Reduction::Sum),
        Some("mean") | Some("avg") => Ok(Reduction::Mean),
        Some("count") => Ok(Reduction::Count),
        Some(other) => Err(RecipeError::UnknownReduction(other.to_string())),
    }
}

fn parse_order(name: &str) -> Result<Order, RecipeError> {
    match name {
        "key" => Ok(Order::Key),
        "weekday" => Ok(Order::Weekday),
        "asc" => Ok(Order::ValueAsc),
        "desc" => Ok(Order::ValueDesc),
        other => Err(RecipeError::UnknownOrder(other.to_string())),
    }
}

fn parse_dimension(name: &str) -> Result<Dimension, RecipeError> {
    Dimension::from_name(name).ok_or_else(|| RecipeError::UnknownDimension(name.to_string()))
}

/// Parse a recipe into a checked chart spec.
///
/// The title defaults to the recipe text. `top(n)` always implies
/// descending value order, whatever `order(..)` says.
pub fn parse_recipe(id: &str, input: &str) -> Result<ChartSpec, RecipeError> {
    let raw = match parse_raw_recipe(input) {
        Ok((_, raw)) => raw,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(RecipeError::Syntax(e.input.trim().to_string()))
        }
        Err(nom::Err::Incomplete(_)) => return Err(RecipeError::Syntax(input.trim().to_string())),
    };

    let kind = parse_kind(&raw.kind)?;
    let reduction = parse_reduction(raw.reduction.as_deref())?;
    let measure = Measure::from_name(&raw.measure).ok_or_else(|| RecipeError::UnknownMeasure(raw.measure.clone()))?;
    let key = parse_dimension(&raw.key)?;

    let mut spec = ChartSpec::new(id, input.trim(), kind, key, measure, reduction);
    if let Some(series) = &raw.series {
        spec = spec.with_series(parse_dimension(series)?);
    }

    for modifier in raw.modifiers {
        match modifier {
            Modifier::Top(n) => spec = spec.with_top_n(n),
            Modifier::Order(name) => spec = spec.with_order(parse_order(&name)?),
            Modifier::Title(title) => spec.title = title,
        }
    }
    if spec.top_n.is_some() {
        spec.order = Order::ValueDesc;
    }

    spec.check().map_err(RecipeError::Invalid)?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{default_catalog, DEFAULT_TOP_N};

    fn catalog_spec(id: &str) -> ChartSpec {
        default_catalog(DEFAULT_TOP_N)
            .into_iter()
            .find(|c| c.id == id)
            .unwrap()
    }

    #[test]
    fn test_recipe_matches_catalog_top10() {
        let spec = parse_recipe("top10_sales", r#"barh(sum(revenue) by product) | top(10) | title("売上金額トップ10商品")"#)
            .unwrap();
        assert_eq!(spec, catalog_spec("top10_sales"));
    }

    #[test]
    fn test_recipe_matches_catalog_trend() {
        let spec = parse_recipe(
            "weekday_vs_subcat",
            r#"line(mean(revenue) by weekday, subcategory) | title("曜日とサブカテゴリの売上傾向")"#,
        )
        .unwrap();
        assert_eq!(spec, catalog_spec("weekday_vs_subcat"));
    }

    #[test]
    fn test_recipe_default_title() {
        let spec = parse_recipe("c", " pie(count(revenue) by subcategory) ").unwrap();
        assert_eq!(spec.title, "pie(count(revenue) by subcategory)");
        assert_eq!(spec.reduction, Reduction::Count);
    }

    #[test]
    fn test_top_wins_over_order() {
        let spec = parse_recipe("t", "bar(sum(quantity) by product) | top(3) | order(asc)").unwrap();
        assert_eq!(spec.order, Order::ValueDesc);
        assert_eq!(spec.top_n, Some(3));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(
            parse_recipe("x", "donut(sum(revenue) by product)"),
            Err(RecipeError::UnknownKind("donut".to_string()))
        );
        assert_eq!(
            parse_recipe("x", "bar(median(revenue) by product)"),
            Err(RecipeError::UnknownReduction("median".to_string()))
        );
        assert_eq!(
            parse_recipe("x", "bar(sum(profit) by product)"),
            Err(RecipeError::UnknownMeasure("profit".to_string()))
        );
        assert_eq!(
            parse_recipe("x", "bar(sum(revenue) by region)"),
            Err(RecipeError::UnknownDimension("region".to_string()))
        );
    }

    #[test]
    fn test_invalid_combination() {
        let err = parse_recipe("x", "bar(revenue by product)").unwrap_err();
        assert!(matches!(err, RecipeError::Invalid(_)));
        let err = parse_recipe("x", "scatter(sum(revenue) by temperature)").unwrap_err();
        assert!(matches!(err, RecipeError::Invalid(_)));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_recipe("x", "bar(sum(revenue) by product").unwrap_err();
        assert!(matches!(err, RecipeError::Syntax(_)));
    }
}
