use super::FamilySpec;

/// Primitive families recognized out of the box.
///
/// `Polyline` accepts `Polygon` predictions of the same arity: a closed polyline is
/// routinely reported as a polygon by recognizers.
pub(super) fn default_families() -> Vec<FamilySpec> {
    const PLAIN: &[&str] = &[
        "Line",
        "Arc",
        "Circle",
        "Ellipse",
        "Helix",
        "Spiral",
        "Curve",
        "Arrow",
        "Rectangle",
        "Square",
        "Diamond",
        "Dot",
        "Wave",
        "Gull",
        "Blob",
        "Infinity",
    ];
    let mut families: Vec<FamilySpec> = PLAIN.iter().map(|name| FamilySpec::plain(name)).collect();
    families.push(FamilySpec {
        name: "Polyline".to_string(),
        parametrized: true,
        accepts: vec!["Polygon".to_string()],
    });
    families.push(FamilySpec {
        name: "Polygon".to_string(),
        parametrized: true,
        accepts: Vec::new(),
    });
    families.push(FamilySpec {
        name: "Complex".to_string(),
        parametrized: true,
        accepts: Vec::new(),
    });
    families
}
