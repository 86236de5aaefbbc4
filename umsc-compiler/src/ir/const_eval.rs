//! Constant folding pass (C7), run over the AST before lowering.
//!
//! Folding happens here rather than inside the lowerer so that lowering
//! never has to special-case "is this operand a literal" itself beyond
//! the one check it already does to choose [`umsc_asm::Quantity::Literal`]
//! over [`umsc_asm::Quantity::Register`]: by the time lowering sees a
//! `Binary` node, either side is already as reduced as it can be.
//!
//! String concatenation folds the same way: `"a" + "b" + name` partially
//! folds the two literal operands into `"ab"` while leaving the
//! non-constant `+ name` for lowering to emit a runtime concatenation (a
//! feature this trigger format has no primitive for beyond building
//! display strings at compile time, so `name` here can only itself be
//! another compile-time-known string, a non-constant operand to `+` on
//! strings is a semantic error the lowerer reports).
//!
//! A point worth calling out explicitly: when folding `lhs + rhs` where
//! both are string literals, the concatenation order is `lhs` followed by
//! `rhs`, the straightforward left-to-right reading of the source
//! expression. It is easy to get this backwards when the two operands are
//! threaded through a couple of helper calls, so the implementation below
//! names them `left`/`right` throughout rather than reusing generic
//! `a`/`b` locals.

use crate::ast::{BinaryOp, Node};

/// Recursively folds every compile-time-constant subexpression of `node`.
/// Statement and declaration structure is left untouched; only `Node`
/// variants that are themselves expressions are candidates for folding.
pub fn fold(node: Node) -> Node {
    match node {
        Node::Binary { op, lhs, rhs } => {
            let left = fold(*lhs);
            let right = fold(*rhs);
            fold_binary(op, left, right)
        }
        Node::Not(inner) => {
            let inner = fold(*inner);
            if let Node::Number(n) = inner {
                Node::Number(if n == 0 { 1 } else { 0 })
            } else {
                Node::Not(Box::new(inner))
            }
        }
        Node::Program(items) => Node::Program(items.into_iter().map(fold).collect()),
        Node::GlobalVariableInit { name, value } => {
            Node::GlobalVariableInit { name, value: Box::new(fold(*value)) }
        }
        Node::FunctionDeclaration { name, params, body } => {
            Node::FunctionDeclaration { name, params, body: body.into_iter().map(fold).collect() }
        }
        Node::FunctionCall { name, args } => {
            Node::FunctionCall { name, args: args.into_iter().map(fold).collect() }
        }
        Node::EventDeclaration { conditions, actions } => Node::EventDeclaration {
            conditions: conditions.into_iter().map(fold).collect(),
            actions: actions.into_iter().map(fold).collect(),
        },
        Node::EventCondition { name, args } => {
            Node::EventCondition { name, args: args.into_iter().map(fold).collect() }
        }
        Node::VariableDeclaration { name, value } => {
            Node::VariableDeclaration { name, value: Box::new(fold(*value)) }
        }
        Node::Assignment { target, index, value } => Node::Assignment {
            target,
            index: index.map(|i| Box::new(fold(*i))),
            value: Box::new(fold(*value)),
        },
        Node::Block(items) => Node::Block(items.into_iter().map(fold).collect()),
        Node::If { condition, then_branch, else_branch } => Node::If {
            condition: Box::new(fold(*condition)),
            then_branch: then_branch.into_iter().map(fold).collect(),
            else_branch: else_branch.into_iter().map(fold).collect(),
        },
        Node::While { condition, body } => Node::While {
            condition: Box::new(fold(*condition)),
            body: body.into_iter().map(fold).collect(),
        },
        Node::Identifier { name, index } => {
            Node::Identifier { name, index: index.map(|i| Box::new(fold(*i))) }
        }
        other => other,
    }
}

fn fold_binary(op: BinaryOp, left: Node, right: Node) -> Node {
    if let (Node::Str(l), Node::Str(r)) = (&left, &right) {
        if op == BinaryOp::Add {
            return Node::Str(format!("{l}{r}"));
        }
    }

    let (Node::Number(l), Node::Number(r)) = (&left, &right) else {
        return Node::binary(op, left, right);
    };
    let (l, r) = (*l, *r);

    let folded = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Subtract => Some((l - r).max(0)),
        BinaryOp::Multiply => l.checked_mul(r),
        BinaryOp::Divide if r != 0 => Some(l / r),
        BinaryOp::Divide => None,
        BinaryOp::Equals => Some((l == r) as i64),
        BinaryOp::NotEquals => Some((l != r) as i64),
        BinaryOp::LessThan => Some((l < r) as i64),
        BinaryOp::LessThanOrEquals => Some((l <= r) as i64),
        BinaryOp::GreaterThan => Some((l > r) as i64),
        BinaryOp::GreaterThanOrEquals => Some((l >= r) as i64),
        BinaryOp::And => Some(((l != 0) && (r != 0)) as i64),
        BinaryOp::Or => Some(((l != 0) || (r != 0)) as i64),
    };

    match folded {
        Some(value) => Node::Number(value),
        None => Node::binary(op, left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_nested_arithmetic() {
        let expr = Node::binary(
            BinaryOp::Add,
            Node::binary(BinaryOp::Multiply, Node::Number(2), Node::Number(3)),
            Node::Number(4),
        );
        assert_eq!(fold(expr), Node::Number(10));
    }

    #[test]
    fn concatenates_string_literals_left_to_right() {
        let expr = Node::binary(
            BinaryOp::Add,
            Node::binary(BinaryOp::Add, Node::Str("foo".into()), Node::Str("bar".into())),
            Node::Str("baz".into()),
        );
        assert_eq!(fold(expr), Node::Str("foobarbaz".into()));
    }

    #[test]
    fn leaves_non_constant_operands_alone() {
        let expr = Node::binary(
            BinaryOp::Add,
            Node::Identifier { name: "x".into(), index: None },
            Node::Number(1),
        );
        assert_eq!(fold(expr.clone()), expr);
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        let expr = Node::binary(BinaryOp::Subtract, Node::Number(2), Node::Number(5));
        assert_eq!(fold(expr), Node::Number(0));
    }
}
