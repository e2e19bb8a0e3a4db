//! Data-driven visual encodings.
//!
//! Each visual channel (node size, link alpha, ...) is bound to a tagged
//! descriptor naming the source property and a typed lookup. Descriptors are
//! validated against the Graph Model when bound, so evaluation never has to
//! guess at property types.

use std::collections::BTreeMap;

use bevy_color::Srgba;

use crate::color::{self, GRAY};
use crate::error::AppError;
use crate::graph::{Link, NetworkGlobal, Node};
use crate::models::{CategoryKey, CommunityId, PropValue};

use super::ContextSettings;

/// Fraction of the scale used for entities missing a numeric value.
pub const MISSING_SCALAR: f32 = 0.01;

/// Node attribute feeding an encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProperty {
    Degree,
    CommunityId,
    Label,
    /// A key of the node's property bag.
    Field(String),
}

/// Link attribute feeding an encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkProperty {
    SourceCommunity,
    TargetCommunity,
    /// A key of the link's property bag.
    Field(String),
}

impl NodeProperty {
    pub fn value(&self, node: &Node) -> PropValue {
        match self {
            NodeProperty::Degree => PropValue::Number(node.degree),
            NodeProperty::CommunityId => community_value(node.community_id),
            NodeProperty::Label => PropValue::Text(node.label.clone()),
            NodeProperty::Field(name) => node.props.get(name).cloned().unwrap_or(PropValue::Null),
        }
    }

    fn name(&self) -> String {
        match self {
            NodeProperty::Degree => "degree".into(),
            NodeProperty::CommunityId => "community".into(),
            NodeProperty::Label => "label".into(),
            NodeProperty::Field(name) => name.clone(),
        }
    }
}

impl LinkProperty {
    pub fn value(&self, global: &NetworkGlobal, link: &Link) -> PropValue {
        match self {
            LinkProperty::SourceCommunity => community_value(global.community_of(link.source_id)),
            LinkProperty::TargetCommunity => community_value(global.community_of(link.target_id)),
            LinkProperty::Field(name) => link.props.get(name).cloned().unwrap_or(PropValue::Null),
        }
    }

    fn name(&self) -> String {
        match self {
            LinkProperty::SourceCommunity => "source community".into(),
            LinkProperty::TargetCommunity => "target community".into(),
            LinkProperty::Field(name) => name.clone(),
        }
    }
}

fn community_value(community: Option<CommunityId>) -> PropValue {
    community.map_or(PropValue::Null, |c| PropValue::Number(c as f64))
}

// ============================================================================
// Descriptors
// ============================================================================

/// Numeric channel (size, width, alpha, bundling strength).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarEncoding<P> {
    Constant(f32),
    /// `scale * inverse_lerp(min, max, value)`, clamped to `[0, scale]`.
    Linear {
        property: P,
        min: f64,
        max: f64,
        scale: f32,
    },
    Categorical {
        property: P,
        values: BTreeMap<CategoryKey, f32>,
        default: f32,
    },
}

/// Color channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorEncoding<P> {
    Constant(Srgba),
    /// Palette color of the entity's community.
    CommunityPalette,
    /// White blended toward `color` by `inverse_lerp(min, max, value)`.
    Linear {
        property: P,
        min: f64,
        max: f64,
        color: Srgba,
    },
    Categorical {
        property: P,
        values: BTreeMap<CategoryKey, Srgba>,
        default: Srgba,
    },
}

/// Boolean channel (bundle start/end).
#[derive(Debug, Clone, PartialEq)]
pub enum FlagEncoding<P> {
    Constant(bool),
    Categorical {
        property: P,
        values: BTreeMap<CategoryKey, bool>,
        default: bool,
    },
}

fn inverse_lerp(min: f64, max: f64, value: f64) -> f32 {
    if (max - min).abs() < f64::EPSILON {
        return 1.0;
    }
    (((value - min) / (max - min)) as f32).clamp(0.0, 1.0)
}

impl<P> ScalarEncoding<P> {
    pub fn evaluate(&self, value_of: impl Fn(&P) -> PropValue) -> f32 {
        match self {
            ScalarEncoding::Constant(v) => *v,
            ScalarEncoding::Linear {
                property,
                min,
                max,
                scale,
            } => match value_of(property).as_f64() {
                Some(v) => inverse_lerp(*min, *max, v) * scale,
                None => MISSING_SCALAR * scale,
            },
            ScalarEncoding::Categorical {
                property,
                values,
                default,
            } => *values.get(&value_of(property).category()).unwrap_or(default),
        }
    }

    fn requirement(&self) -> Option<(&P, bool)> {
        match self {
            ScalarEncoding::Constant(_) => None,
            ScalarEncoding::Linear { property, .. } => Some((property, true)),
            ScalarEncoding::Categorical { property, .. } => Some((property, false)),
        }
    }
}

impl<P> ColorEncoding<P> {
    pub fn evaluate(
        &self,
        value_of: impl Fn(&P) -> PropValue,
        community: Option<CommunityId>,
    ) -> Srgba {
        match self {
            ColorEncoding::Constant(c) => *c,
            ColorEncoding::CommunityPalette => community
                .map(|c| color::palette_color(c.max(0) as usize))
                .unwrap_or(GRAY),
            ColorEncoding::Linear {
                property,
                min,
                max,
                color,
            } => match value_of(property).as_f64() {
                Some(v) => color::tint(*color, inverse_lerp(*min, *max, v)),
                None => GRAY,
            },
            ColorEncoding::Categorical {
                property,
                values,
                default,
            } => *values.get(&value_of(property).category()).unwrap_or(default),
        }
    }

    fn requirement(&self) -> Option<(&P, bool)> {
        match self {
            ColorEncoding::Constant(_) | ColorEncoding::CommunityPalette => None,
            ColorEncoding::Linear { property, .. } => Some((property, true)),
            ColorEncoding::Categorical { property, .. } => Some((property, false)),
        }
    }
}

impl<P> FlagEncoding<P> {
    pub fn evaluate(&self, value_of: impl Fn(&P) -> PropValue) -> bool {
        match self {
            FlagEncoding::Constant(b) => *b,
            FlagEncoding::Categorical {
                property,
                values,
                default,
            } => *values.get(&value_of(property).category()).unwrap_or(default),
        }
    }

    fn requirement(&self) -> Option<(&P, bool)> {
        match self {
            FlagEncoding::Constant(_) => None,
            FlagEncoding::Categorical { property, .. } => Some((property, false)),
        }
    }
}

// ============================================================================
// Bound encodings
// ============================================================================

/// Node channels.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEncodings {
    pub size: ScalarEncoding<NodeProperty>,
    pub color: ColorEncoding<NodeProperty>,
}

/// Link channels.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEncodings {
    pub width: ScalarEncoding<LinkProperty>,
    pub bundling_strength: ScalarEncoding<LinkProperty>,
    pub color_start: ColorEncoding<LinkProperty>,
    pub color_end: ColorEncoding<LinkProperty>,
    pub bundle_start: FlagEncoding<LinkProperty>,
    pub bundle_end: FlagEncoding<LinkProperty>,
    pub alpha: ScalarEncoding<LinkProperty>,
}

/// Evaluated link attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkVisual {
    pub width: f32,
    pub bundling_strength: f32,
    pub color_start: Srgba,
    pub color_end: Srgba,
    pub bundle_start: bool,
    pub bundle_end: bool,
    pub alpha: f32,
}

/// Every encoding bound to a context.
#[derive(Debug, Clone, PartialEq)]
pub struct Encodings {
    pub node: NodeEncodings,
    pub link: LinkEncodings,
}

impl Encodings {
    /// Constant encodings taken from the settings, with community colors.
    pub fn defaults(settings: &ContextSettings) -> Self {
        Self {
            node: NodeEncodings {
                size: ScalarEncoding::Constant(settings.node_scale),
                color: ColorEncoding::CommunityPalette,
            },
            link: LinkEncodings {
                width: ScalarEncoding::Constant(settings.link_width),
                bundling_strength: ScalarEncoding::Constant(settings.edge_bundling_strength),
                color_start: ColorEncoding::Constant(settings.link_default_color),
                color_end: ColorEncoding::Constant(settings.link_default_color),
                bundle_start: FlagEncoding::Constant(true),
                bundle_end: FlagEncoding::Constant(true),
                alpha: ScalarEncoding::Constant(settings.link_normal_alpha),
            },
        }
    }

    pub fn node_size(&self, node: &Node) -> f32 {
        self.node.size.evaluate(|p| p.value(node))
    }

    pub fn node_color(&self, node: &Node) -> Srgba {
        self.node.color.evaluate(|p| p.value(node), node.community_id)
    }

    pub fn link_visual(&self, global: &NetworkGlobal, link: &Link) -> LinkVisual {
        let value_of = |p: &LinkProperty| p.value(global, link);
        let source = global.community_of(link.source_id);
        let target = global.community_of(link.target_id);
        let enc = &self.link;

        LinkVisual {
            width: enc.width.evaluate(value_of),
            bundling_strength: enc.bundling_strength.evaluate(value_of),
            color_start: enc.color_start.evaluate(value_of, source),
            color_end: enc.color_end.evaluate(value_of, target),
            bundle_start: enc.bundle_start.evaluate(value_of),
            bundle_end: enc.bundle_end.evaluate(value_of),
            alpha: enc.alpha.evaluate(value_of),
        }
    }

    // ------------------------------------------------------------------------
    // Validated setters
    // ------------------------------------------------------------------------

    pub fn set_node_size(
        &mut self,
        global: &NetworkGlobal,
        encoding: ScalarEncoding<NodeProperty>,
    ) -> Result<(), AppError> {
        validate_node(global, encoding.requirement())?;
        self.node.size = encoding;
        Ok(())
    }

    pub fn set_node_color(
        &mut self,
        global: &NetworkGlobal,
        encoding: ColorEncoding<NodeProperty>,
    ) -> Result<(), AppError> {
        validate_node(global, encoding.requirement())?;
        self.node.color = encoding;
        Ok(())
    }

    pub fn set_link_width(
        &mut self,
        global: &NetworkGlobal,
        encoding: ScalarEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.width = encoding;
        Ok(())
    }

    pub fn set_link_bundling_strength(
        &mut self,
        global: &NetworkGlobal,
        encoding: ScalarEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.bundling_strength = encoding;
        Ok(())
    }

    pub fn set_link_color_start(
        &mut self,
        global: &NetworkGlobal,
        encoding: ColorEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.color_start = encoding;
        Ok(())
    }

    pub fn set_link_color_end(
        &mut self,
        global: &NetworkGlobal,
        encoding: ColorEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.color_end = encoding;
        Ok(())
    }

    pub fn set_link_bundle_start(
        &mut self,
        global: &NetworkGlobal,
        encoding: FlagEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.bundle_start = encoding;
        Ok(())
    }

    pub fn set_link_bundle_end(
        &mut self,
        global: &NetworkGlobal,
        encoding: FlagEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.bundle_end = encoding;
        Ok(())
    }

    pub fn set_link_alpha(
        &mut self,
        global: &NetworkGlobal,
        encoding: ScalarEncoding<LinkProperty>,
    ) -> Result<(), AppError> {
        validate_link(global, encoding.requirement())?;
        self.link.alpha = encoding;
        Ok(())
    }
}

fn validate_node(
    global: &NetworkGlobal,
    requirement: Option<(&NodeProperty, bool)>,
) -> Result<(), AppError> {
    let Some((property, numeric)) = requirement else {
        return Ok(());
    };
    let values = global
        .nodes
        .iter()
        .filter(|n| !n.is_virtual)
        .map(|n| property.value(n));
    check_values(&property.name(), values, numeric)
}

fn validate_link(
    global: &NetworkGlobal,
    requirement: Option<(&LinkProperty, bool)>,
) -> Result<(), AppError> {
    let Some((property, numeric)) = requirement else {
        return Ok(());
    };
    let values = global.links.iter().map(|l| property.value(global, l));
    check_values(&property.name(), values, numeric)
}

/// A property must exist on some entity, and be numeric wherever present
/// when a numeric encoding reads it.
fn check_values(
    name: &str,
    values: impl Iterator<Item = PropValue>,
    numeric: bool,
) -> Result<(), AppError> {
    let mut present = false;
    for value in values.filter(|v| !v.is_null()) {
        present = true;
        if numeric && value.as_f64().is_none() {
            return Err(AppError::Encoding(format!(
                "property '{}' is not numeric (found {})",
                name, value
            )));
        }
    }
    if !present {
        return Err(AppError::Encoding(format!("property '{}' not found", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn global() -> NetworkGlobal {
        NetworkGlobal::build(&fixtures::friends_network()).unwrap()
    }

    #[test]
    fn test_linear_scalar_clamps_and_handles_missing() {
        let enc = ScalarEncoding::Linear {
            property: NodeProperty::Field("grade".into()),
            min: 9.0,
            max: 12.0,
            scale: 2.0,
        };

        assert_eq!(enc.evaluate(|_| PropValue::Number(9.0)), 0.0);
        assert_eq!(enc.evaluate(|_| PropValue::Number(12.0)), 2.0);
        assert_eq!(enc.evaluate(|_| PropValue::Number(20.0)), 2.0);
        assert_eq!(enc.evaluate(|_| PropValue::Null), MISSING_SCALAR * 2.0);
    }

    #[test]
    fn test_categorical_color_with_default() {
        let red = Srgba::rgb(1.0, 0.0, 0.0);
        let enc = ColorEncoding::Categorical {
            property: NodeProperty::Field("smoker".into()),
            values: BTreeMap::from([(CategoryKey::Bool(true), red)]),
            default: Srgba::WHITE,
        };

        assert_eq!(enc.evaluate(|_| PropValue::Bool(true), None), red);
        assert_eq!(enc.evaluate(|_| PropValue::Bool(false), None), Srgba::WHITE);
        assert_eq!(enc.evaluate(|_| PropValue::Null, None), Srgba::WHITE);
    }

    #[test]
    fn test_setter_rejects_non_numeric_property() {
        let global = global();
        let mut encodings = Encodings::defaults(&ContextSettings::default());

        let err = encodings
            .set_node_size(
                &global,
                ScalarEncoding::Linear {
                    property: NodeProperty::Field("smoker".into()),
                    min: 0.0,
                    max: 1.0,
                    scale: 1.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Encoding(_)));
        assert_eq!(encodings.node.size, ScalarEncoding::Constant(1.0));
    }

    #[test]
    fn test_setter_rejects_unknown_property() {
        let global = global();
        let mut encodings = Encodings::defaults(&ContextSettings::default());

        let result = encodings.set_link_alpha(
            &global,
            ScalarEncoding::Categorical {
                property: LinkProperty::Field("weight".into()),
                values: BTreeMap::new(),
                default: 0.1,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_setter_accepts_sparse_values() {
        let global = global();
        let mut encodings = Encodings::defaults(&ContextSettings::default());

        encodings
            .set_node_size(
                &global,
                ScalarEncoding::Linear {
                    property: NodeProperty::Field("grade".into()),
                    min: 9.0,
                    max: 12.0,
                    scale: 1.0,
                },
            )
            .unwrap();

        let missing = global.nodes.get(fixtures::member(0, 9)).unwrap();
        assert_eq!(encodings.node_size(missing), MISSING_SCALAR);
    }

    #[test]
    fn test_default_link_visual_uses_settings() {
        let global = global();
        let settings = ContextSettings::default();
        let encodings = Encodings::defaults(&settings);
        let link = global.links.iter().next().unwrap();

        let visual = encodings.link_visual(&global, link);
        assert_eq!(visual.width, settings.link_width);
        assert_eq!(visual.bundling_strength, settings.edge_bundling_strength);
        assert_eq!(visual.alpha, settings.link_normal_alpha);
        assert!(visual.bundle_start && visual.bundle_end);
    }
}
