// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operation rule tables.
//!
//! Each primitive operator owns a fixed table mapping operand kinds to a
//! result kind. Lookup is a linear scan in table order; a binary rule also
//! matches the swapped pair when it is flagged commutative. A miss resolves
//! to [`ValueKind::Invalid`], which callers turn into a node validation error.

use crate::port::ValueKind;
use std::sync::OnceLock;

use ValueKind::{Color, Float, Vector2, Vector3, Vector4};

/// Primitive binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `a + b`
    Addition,
    /// `a - b`
    Subtraction,
    /// `a * b`
    Multiplication,
    /// `a / b`
    Division,
    /// `dot(a, b)`
    DotProduct,
    /// `cross(a, b)`
    CrossProduct,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `pow(a, b)`
    Pow,
}

/// Primitive ternary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TernaryOperator {
    /// `mix(a, b, t)`
    Mix,
    /// `smoothstep(edge0, edge1, x)`
    SmoothStep,
}

/// Binary table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryRule {
    /// First operand kind
    pub a: ValueKind,
    /// Second operand kind
    pub b: ValueKind,
    /// Result kind
    pub output: ValueKind,
    /// Whether `(b, a)` matches as well
    pub commutative: bool,
}

impl BinaryRule {
    const fn exact(a: ValueKind, b: ValueKind, output: ValueKind) -> Self {
        Self {
            a,
            b,
            output,
            commutative: false,
        }
    }

    const fn commutative(a: ValueKind, b: ValueKind, output: ValueKind) -> Self {
        Self {
            a,
            b,
            output,
            commutative: true,
        }
    }

    fn matches(&self, a: ValueKind, b: ValueKind) -> bool {
        (self.a == a && self.b == b) || (self.commutative && self.a == b && self.b == a)
    }
}

/// Ternary table entry (always ordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TernaryRule {
    /// First operand kind
    pub a: ValueKind,
    /// Second operand kind
    pub b: ValueKind,
    /// Third operand kind
    pub c: ValueKind,
    /// Result kind
    pub output: ValueKind,
}

const fn ternary(a: ValueKind, b: ValueKind, c: ValueKind, output: ValueKind) -> TernaryRule {
    TernaryRule { a, b, c, output }
}

/// Immutable rule tables for every operator
#[derive(Debug)]
pub struct OperationRules {
    arithmetic: Vec<BinaryRule>,
    min_max: Vec<BinaryRule>,
    dot: Vec<BinaryRule>,
    cross: Vec<BinaryRule>,
    pow: Vec<BinaryRule>,
    interpolation: Vec<TernaryRule>,
}

impl OperationRules {
    /// Build the tables
    pub fn new() -> Self {
        let same_kind = |output: fn(ValueKind) -> ValueKind| {
            [Float, Vector2, Vector3, Vector4, Color]
                .into_iter()
                .map(move |kind| BinaryRule::exact(kind, kind, output(kind)))
        };

        // Scalar/vector mixing is legal on either side for arithmetic
        let mut arithmetic: Vec<_> = same_kind(|kind| kind).collect();
        arithmetic.extend([
            BinaryRule::commutative(Float, Vector2, Vector2),
            BinaryRule::commutative(Float, Vector3, Vector3),
            BinaryRule::commutative(Float, Vector4, Vector4),
            BinaryRule::commutative(Float, Color, Color),
            BinaryRule::commutative(Vector4, Color, Color),
        ]);

        let mut min_max: Vec<_> = same_kind(|kind| kind).collect();
        min_max.extend([
            BinaryRule::commutative(Vector2, Float, Vector2),
            BinaryRule::commutative(Vector3, Float, Vector3),
            BinaryRule::commutative(Vector4, Float, Vector4),
            BinaryRule::commutative(Color, Float, Color),
        ]);

        let mut dot: Vec<_> = same_kind(|_| Float).collect();
        dot.push(BinaryRule::commutative(Vector4, Color, Float));

        let cross = vec![BinaryRule::commutative(Vector3, Vector3, Vector3)];

        // pow takes a scalar exponent only on the right
        let mut pow: Vec<_> = same_kind(|kind| kind).collect();
        pow.extend([
            BinaryRule::exact(Vector2, Float, Vector2),
            BinaryRule::exact(Vector3, Float, Vector3),
            BinaryRule::exact(Vector4, Float, Vector4),
            BinaryRule::exact(Color, Float, Color),
        ]);

        let mut interpolation = vec![ternary(Float, Float, Float, Float)];
        for kind in [Vector2, Vector3, Vector4, Color] {
            interpolation.push(ternary(kind, kind, kind, kind));
            interpolation.push(ternary(kind, kind, Float, kind));
        }

        Self {
            arithmetic,
            min_max,
            dot,
            cross,
            pow,
            interpolation,
        }
    }

    /// Process-wide tables, built on first use
    pub fn shared() -> &'static OperationRules {
        static RULES: OnceLock<OperationRules> = OnceLock::new();
        RULES.get_or_init(OperationRules::new)
    }

    /// Table for a binary operator
    pub fn binary_rules(&self, op: BinaryOperator) -> &[BinaryRule] {
        match op {
            BinaryOperator::Addition
            | BinaryOperator::Subtraction
            | BinaryOperator::Multiplication
            | BinaryOperator::Division => &self.arithmetic,
            BinaryOperator::Min | BinaryOperator::Max => &self.min_max,
            BinaryOperator::DotProduct => &self.dot,
            BinaryOperator::CrossProduct => &self.cross,
            BinaryOperator::Pow => &self.pow,
        }
    }

    /// Table for a ternary operator (Mix and SmoothStep share one)
    pub fn ternary_rules(&self, _op: TernaryOperator) -> &[TernaryRule] {
        &self.interpolation
    }

    /// Resolve the result kind of a binary operator.
    ///
    /// Operands must already be unwrapped; `Any` never matches.
    pub fn resolve(&self, op: BinaryOperator, a: ValueKind, b: ValueKind) -> ValueKind {
        debug_assert!(a != ValueKind::Any && b != ValueKind::Any);
        self.binary_rules(op)
            .iter()
            .find(|rule| rule.matches(a, b))
            .map_or(ValueKind::Invalid, |rule| rule.output)
    }

    /// Resolve the result kind of a ternary operator (exact order only)
    pub fn resolve_ternary(
        &self,
        op: TernaryOperator,
        a: ValueKind,
        b: ValueKind,
        c: ValueKind,
    ) -> ValueKind {
        self.ternary_rules(op)
            .iter()
            .find(|rule| rule.a == a && rule.b == b && rule.c == c)
            .map_or(ValueKind::Invalid, |rule| rule.output)
    }
}

impl Default for OperationRules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ValueKind::Texture;

    const SYMMETRIC: [BinaryOperator; 8] = [
        BinaryOperator::Addition,
        BinaryOperator::Subtraction,
        BinaryOperator::Multiplication,
        BinaryOperator::Division,
        BinaryOperator::Min,
        BinaryOperator::Max,
        BinaryOperator::DotProduct,
        BinaryOperator::CrossProduct,
    ];

    #[test]
    fn test_commutative_tables_are_symmetric() {
        let rules = OperationRules::new();
        for op in SYMMETRIC {
            for a in ValueKind::CONCRETE {
                for b in ValueKind::CONCRETE {
                    assert_eq!(
                        rules.resolve(op, a, b),
                        rules.resolve(op, b, a),
                        "{op:?}({a}, {b})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_pow_is_not_symmetric() {
        let rules = OperationRules::new();
        assert_eq!(rules.resolve(BinaryOperator::Pow, Vector3, Float), Vector3);
        assert_eq!(rules.resolve(BinaryOperator::Pow, Float, Vector3), ValueKind::Invalid);
        assert_eq!(rules.resolve(BinaryOperator::Pow, Float, Color), ValueKind::Invalid);
    }

    #[test]
    fn test_missing_pairs_are_invalid() {
        let rules = OperationRules::new();
        assert_eq!(rules.resolve(BinaryOperator::Addition, Float, Texture), ValueKind::Invalid);
        assert_eq!(rules.resolve(BinaryOperator::Addition, Vector2, Vector3), ValueKind::Invalid);
        assert_eq!(rules.resolve(BinaryOperator::CrossProduct, Vector2, Vector2), ValueKind::Invalid);
    }

    #[test]
    fn test_scalar_promotion() {
        let rules = OperationRules::new();
        assert_eq!(rules.resolve(BinaryOperator::Multiplication, Float, Vector3), Vector3);
        assert_eq!(rules.resolve(BinaryOperator::Multiplication, Vector3, Float), Vector3);
        assert_eq!(rules.resolve(BinaryOperator::Addition, Vector4, Color), Color);
        assert_eq!(rules.resolve(BinaryOperator::DotProduct, Vector3, Vector3), Float);
        assert_eq!(rules.resolve(BinaryOperator::Max, Float, Vector2), Vector2);
    }

    #[test]
    fn test_ternary_rules_are_ordered() {
        let rules = OperationRules::new();
        let mix = TernaryOperator::Mix;
        assert_eq!(rules.resolve_ternary(mix, Vector3, Vector3, Float), Vector3);
        assert_eq!(rules.resolve_ternary(mix, Vector3, Vector2, Float), ValueKind::Invalid);
        assert_eq!(rules.resolve_ternary(mix, Float, Vector3, Vector3), ValueKind::Invalid);
        assert_eq!(
            rules.resolve_ternary(TernaryOperator::SmoothStep, Float, Float, Float),
            Float
        );
    }

    #[test]
    fn test_shared_tables_are_reused() {
        assert!(std::ptr::eq(OperationRules::shared(), OperationRules::shared()));
    }
}
