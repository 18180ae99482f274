//! Selector evaluation.
//!
//! Each stage receives a shape and a continuation. A stage that keeps the
//! shape (or produces new ones) hands each result to the continuation; the
//! continuation can stop the whole traversal by returning
//! [`Response::Stop`].

use std::collections::{BTreeMap, HashSet, VecDeque};

use tessel_core::{Model, Shape, ShapeId, ShapeKind};

use crate::ast::{AttributeTest, Neighbor, ScopedOperand, ScopedTest, Sequence, Stage};
use crate::attribute::{compare, AttributeValue};
use crate::neighbor::{Direction, NeighborIndex, RelationshipKind};
use crate::parser::Parsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Response {
    Continue,
    Stop,
}

pub(crate) type Variables<'m> = BTreeMap<String, Vec<&'m Shape>>;

type Next<'n, 'm> = &'n mut dyn FnMut(&mut Context<'m>, &'m Shape) -> Response;

/// Per-evaluation state. Nothing here outlives one call into the engine.
pub(crate) struct Context<'m> {
    index: NeighborIndex<'m>,
    vars: Variables<'m>,
    roots: Vec<Vec<&'m Shape>>,
}

impl<'m> Context<'m> {
    /// Build the neighbor index and evaluate every `:root` expression once.
    pub(crate) fn new(model: &'m Model, parsed: &Parsed) -> Self {
        let mut ctx = Context {
            index: NeighborIndex::new(model),
            vars: Variables::new(),
            roots: Vec::with_capacity(parsed.roots.len()),
        };
        // Nested roots are registered first, so each root only depends on
        // earlier ones.
        for root in &parsed.roots {
            let mut result = Vec::new();
            let mut seen = HashSet::new();
            for shape in model.shapes_with_members() {
                ctx.vars.clear();
                push_sequence(&mut ctx, root, shape, &mut |_: &mut Context<'m>, s: &'m Shape| {
                    if seen.insert(s.id()) {
                        result.push(s);
                    }
                    Response::Continue
                });
            }
            ctx.roots.push(result);
        }
        ctx.vars.clear();
        ctx
    }

    /// Run the selector from `start`, with variables reset.
    pub(crate) fn run_from(
        &mut self,
        sequence: &Sequence,
        start: &'m Shape,
        sink: &mut dyn FnMut(&'m Shape, &Variables<'m>),
    ) {
        self.vars.clear();
        push_sequence(self, sequence, start, &mut |ctx: &mut Context<'m>, s: &'m Shape| {
            sink(s, &ctx.vars);
            Response::Continue
        });
    }
}

pub(crate) fn push_sequence<'m>(
    ctx: &mut Context<'m>,
    sequence: &Sequence,
    shape: &'m Shape,
    next: Next<'_, 'm>,
) -> Response {
    push_stages(ctx, &sequence.0, shape, next)
}

fn push_stages<'m>(
    ctx: &mut Context<'m>,
    stages: &[Stage],
    shape: &'m Shape,
    next: Next<'_, 'm>,
) -> Response {
    match stages.split_first() {
        None => next(ctx, shape),
        Some((first, rest)) => push_stage(
            ctx,
            first,
            shape,
            &mut |ctx: &mut Context<'m>, s: &'m Shape| push_stages(ctx, rest, s, &mut *next),
        ),
    }
}

fn push_stage<'m>(
    ctx: &mut Context<'m>,
    stage: &Stage,
    shape: &'m Shape,
    next: Next<'_, 'm>,
) -> Response {
    match stage {
        Stage::Kind(kind) => keep_if(shape.kind() == *kind, ctx, shape, next),
        Stage::Category(category) => keep_if(category.matches(shape.kind()), ctx, shape, next),
        Stage::Attribute(test) => {
            let keep = attribute_matches(ctx, test, shape);
            keep_if(keep, ctx, shape, next)
        }
        Stage::Scoped(test) => {
            let keep = scoped_matches(ctx, test, shape);
            keep_if(keep, ctx, shape, next)
        }
        Stage::Neighbor(neighbor) => {
            let found = neighbors(ctx, neighbor, shape);
            send_all(ctx, found, next)
        }
        Stage::Not(sequence) => {
            let keep = !yields_any(ctx, sequence, shape);
            keep_if(keep, ctx, shape, next)
        }
        Stage::Test(sequences) => {
            let keep = sequences.iter().any(|seq| yields_any(ctx, seq, shape));
            keep_if(keep, ctx, shape, next)
        }
        Stage::Is(sequences) => {
            for sequence in sequences {
                if push_sequence(ctx, sequence, shape, &mut *next) == Response::Stop {
                    return Response::Stop;
                }
            }
            Response::Continue
        }
        Stage::In(sequence) => {
            let keep = collect(ctx, sequence, shape)
                .iter()
                .any(|s| s.id() == shape.id());
            keep_if(keep, ctx, shape, next)
        }
        Stage::Root(index) => {
            let shapes = ctx.roots.get(*index).cloned().unwrap_or_default();
            send_all(ctx, shapes, next)
        }
        Stage::TopDown(qualifier, disqualifier) => {
            if !matches!(
                shape.kind(),
                ShapeKind::Service | ShapeKind::Resource | ShapeKind::Operation
            ) {
                return Response::Continue;
            }
            let mut visited = HashSet::new();
            top_down(
                ctx,
                qualifier,
                disqualifier.as_ref(),
                shape,
                false,
                next,
                &mut visited,
            )
        }
        Stage::Recursive(sequence) => {
            let mut visited: HashSet<&ShapeId> = HashSet::new();
            let mut queue: VecDeque<&'m Shape> = collect(ctx, sequence, shape).into();
            while let Some(current) = queue.pop_front() {
                if !visited.insert(current.id()) {
                    continue;
                }
                if next(ctx, current) == Response::Stop {
                    return Response::Stop;
                }
                queue.extend(collect(ctx, sequence, current));
            }
            Response::Continue
        }
        Stage::StoreVariable(name, sequence) => {
            let found = collect(ctx, sequence, shape);
            ctx.vars.insert(name.clone(), found);
            next(ctx, shape)
        }
        Stage::GetVariable(name) => {
            let shapes = ctx.vars.get(name).cloned().unwrap_or_default();
            send_all(ctx, shapes, next)
        }
        Stage::Unknown(_) => Response::Continue,
    }
}

fn keep_if<'m>(keep: bool, ctx: &mut Context<'m>, shape: &'m Shape, next: Next<'_, 'm>) -> Response {
    if keep {
        next(ctx, shape)
    } else {
        Response::Continue
    }
}

fn send_all<'m>(ctx: &mut Context<'m>, shapes: Vec<&'m Shape>, next: Next<'_, 'm>) -> Response {
    for shape in shapes {
        if next(ctx, shape) == Response::Stop {
            return Response::Stop;
        }
    }
    Response::Continue
}

fn yields_any<'m>(ctx: &mut Context<'m>, sequence: &Sequence, shape: &'m Shape) -> bool {
    let mut found = false;
    push_sequence(ctx, sequence, shape, &mut |_: &mut Context<'m>, _: &'m Shape| {
        found = true;
        Response::Stop
    });
    found
}

fn collect<'m>(ctx: &mut Context<'m>, sequence: &Sequence, shape: &'m Shape) -> Vec<&'m Shape> {
    let mut out: Vec<&'m Shape> = Vec::new();
    push_sequence(ctx, sequence, shape, &mut |_: &mut Context<'m>, s: &'m Shape| {
        if !out.iter().any(|o| o.id() == s.id()) {
            out.push(s);
        }
        Response::Continue
    });
    out
}

fn top_down<'m>(
    ctx: &mut Context<'m>,
    qualifier: &Sequence,
    disqualifier: Option<&Sequence>,
    shape: &'m Shape,
    mut qualified: bool,
    next: Next<'_, 'm>,
    visited: &mut HashSet<ShapeId>,
) -> Response {
    if !visited.insert(shape.id().clone()) {
        return Response::Continue;
    }

    if !qualified && yields_any(ctx, qualifier, shape) {
        qualified = true;
    } else if qualified && disqualifier.is_some_and(|d| yields_any(ctx, d, shape)) {
        qualified = false;
    }

    if qualified && next(ctx, shape) == Response::Stop {
        return Response::Stop;
    }

    let children: Vec<&'m Shape> = ctx
        .index
        .neighbors(shape.id())
        .iter()
        .filter(|rel| matches!(rel.kind, RelationshipKind::Resource | RelationshipKind::Operation))
        .filter(|rel| rel.neighbor.id() != shape.id())
        .map(|rel| rel.neighbor)
        .collect();
    for child in children {
        let response = top_down(ctx, qualifier, disqualifier, child, qualified, &mut *next, visited);
        if response == Response::Stop {
            return Response::Stop;
        }
    }
    Response::Continue
}

fn neighbors<'m>(ctx: &Context<'m>, neighbor: &Neighbor, shape: &'m Shape) -> Vec<&'m Shape> {
    let undirected = |kind: RelationshipKind| {
        kind != RelationshipKind::Trait && kind.direction() == Direction::Directed
    };
    let labelled = |kind: RelationshipKind, labels: &[String]| {
        kind.label()
            .is_some_and(|label| labels.iter().any(|l| l == label))
    };

    let mut found: Vec<&'m Shape> = match neighbor {
        Neighbor::Forward => ctx
            .index
            .neighbors(shape.id())
            .iter()
            .filter(|rel| undirected(rel.kind))
            .map(|rel| rel.neighbor)
            .collect(),
        Neighbor::Reverse => ctx
            .index
            .reverse_neighbors(shape.id())
            .iter()
            .filter(|rel| undirected(rel.kind))
            .map(|rel| rel.source)
            .collect(),
        Neighbor::ForwardDirected(labels) => ctx
            .index
            .neighbors(shape.id())
            .iter()
            .filter(|rel| labelled(rel.kind, labels.as_slice()))
            .map(|rel| rel.neighbor)
            .collect(),
        Neighbor::ReverseDirected(labels) => ctx
            .index
            .reverse_neighbors(shape.id())
            .iter()
            .filter(|rel| labelled(rel.kind, labels.as_slice()))
            .map(|rel| rel.source)
            .collect(),
        Neighbor::Recursive => {
            let mut visited: HashSet<&ShapeId> = HashSet::new();
            let mut out = Vec::new();
            let mut queue: VecDeque<&'m Shape> = VecDeque::from([shape]);
            while let Some(current) = queue.pop_front() {
                for rel in ctx.index.neighbors(current.id()) {
                    if undirected(rel.kind) && visited.insert(rel.neighbor.id()) {
                        out.push(rel.neighbor);
                        queue.push_back(rel.neighbor);
                    }
                }
            }
            out
        }
    };

    let mut seen = HashSet::new();
    found.retain(|s| seen.insert(s.id()));
    found
}

fn attribute_value<'m>(ctx: &Context<'m>, shape: &'m Shape, path: &[String]) -> AttributeValue<'m> {
    match path.split_first() {
        Some((root, rest)) if root == "var" => {
            let Some((name, rest)) = rest.split_first() else {
                return AttributeValue::Empty;
            };
            match ctx.vars.get(name) {
                Some(shapes) => AttributeValue::Projection(
                    shapes.iter().map(|s| AttributeValue::Shape(*s)).collect(),
                )
                .path(rest),
                None => AttributeValue::Empty,
            }
        }
        _ => AttributeValue::Shape(shape).path(path),
    }
}

fn attribute_matches<'m>(ctx: &Context<'m>, test: &AttributeTest, shape: &'m Shape) -> bool {
    let value = attribute_value(ctx, shape, &test.path);
    match &test.comparison {
        None => value.is_present(),
        Some((comparator, expected, case_insensitive)) => {
            let expected: Vec<AttributeValue<'_>> =
                expected.iter().map(AttributeValue::literal).collect();
            compare(&value, *comparator, &expected, *case_insensitive)
        }
    }
}

fn scoped_matches<'m>(ctx: &Context<'m>, test: &ScopedTest, shape: &'m Shape) -> bool {
    let base = attribute_value(ctx, shape, &test.path);
    let scopes = if base.is_projection() {
        base.flatten()
    } else {
        vec![base]
    };

    let resolve = |scope: &AttributeValue<'m>, operand: &ScopedOperand| match operand {
        ScopedOperand::Path(path) => scope.path(path),
        ScopedOperand::Literal(value) => AttributeValue::literal(value),
    };

    scopes.iter().any(|scope| {
        test.assertions.iter().all(|assertion| {
            let lhs = resolve(scope, &assertion.lhs);
            let rhs: Vec<AttributeValue<'m>> =
                assertion.rhs.iter().map(|op| resolve(scope, op)).collect();
            compare(&lhs, assertion.comparator, &rhs, assertion.case_insensitive)
        })
    })
}
