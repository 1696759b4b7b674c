//! Compiled filters: text fragments interleaved with deferred generators.

pub mod generator;

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    lower,
    operand::Operand,
    postprocess::ResolvedPostProcessor,
};
use generator::Generator;
use grammar::{LiteralMode, Renderer, Statement};
use model::{
    core::{value::Value, value_type::ValueType},
    records::record::ResultSet,
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum Fragment {
    Text(String),
    /// Rendered as a placeholder or inline, depending on the literal mode.
    Literal(Value),
    /// Always-true or always-false filter in the backend's grammar.
    Constant(bool),
    /// Produces more fragments at resolution time.
    Generator(Arc<dyn Generator>),
}

/// A postprocessor requested by `filter()`; name and data are evaluated at
/// resolution time.
#[derive(Debug, Clone)]
pub struct PostProcessorRegistration {
    pub name: Operand,
    pub data: Option<Operand>,
}

/// Append-only list of fragments and postprocessor registrations.
#[derive(Debug, Clone, Default)]
pub struct FilterPart {
    fragments: Vec<Fragment>,
    postprocessors: Vec<PostProcessorRegistration>,
}

impl FilterPart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, text: &str) {
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Text(text.to_string()));
        }
    }

    pub fn push_literal(&mut self, value: Value) {
        self.fragments.push(Fragment::Literal(value));
    }

    pub fn push_constant(&mut self, value: bool) {
        self.fragments.push(Fragment::Constant(value));
    }

    pub fn push_generator(&mut self, generator: impl Generator + 'static) {
        self.fragments.push(Fragment::Generator(Arc::new(generator)));
    }

    /// Moves every fragment and registration of `other` onto the end of this part.
    pub fn append(&mut self, other: FilterPart) {
        for fragment in other.fragments {
            match fragment {
                Fragment::Text(text) => self.push_str(&text),
                fragment => self.fragments.push(fragment),
            }
        }
        self.postprocessors.extend(other.postprocessors);
    }

    pub fn attach_postprocessor(&mut self, registration: PostProcessorRegistration) {
        self.postprocessors.push(registration);
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn postprocessors(&self) -> &[PostProcessorRegistration] {
        &self.postprocessors
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Whether resolution needs to run any generator.
    pub fn is_deferred(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| matches!(f, Fragment::Generator(_)))
    }

    fn render(
        &self,
        ctx: &QueryContext<'_>,
        renderer: &mut Renderer<'_>,
        postprocessors: &mut Vec<ResolvedPostProcessor>,
    ) -> Result<()> {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => renderer.push_str(text),
                Fragment::Literal(value) => renderer.add_literal(value),
                Fragment::Constant(value) => {
                    renderer.push_str(lower::constant_text(ctx.backend(), *value))
                }
                Fragment::Generator(generator) => {
                    let mut generated = FilterPart::new();
                    generator.generate(ctx, &mut generated)?;
                    generated.render(ctx, renderer, postprocessors)?;
                }
            }
        }

        for registration in &self.postprocessors {
            if let Some(resolved) = resolve_registration(ctx, registration)? {
                postprocessors.push(resolved);
            }
        }
        Ok(())
    }
}

/// A filter statement ready for a backend, plus the postprocessors to run
/// over its results.
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    pub statement: Statement,
    pub postprocessors: Vec<ResolvedPostProcessor>,
}

impl ResolvedFilter {
    /// Runs every postprocessor once, in registration order.
    pub fn apply_postprocessors(&self, results: &mut ResultSet) -> Result<()> {
        for postprocessor in &self.postprocessors {
            debug!(name = %postprocessor.name, rows = results.len(), "Applying postprocessor");
            postprocessor.apply(results)?;
        }
        Ok(())
    }
}

pub(crate) fn resolve_part(ctx: &QueryContext<'_>, part: &FilterPart) -> Result<ResolvedFilter> {
    let mode = if ctx.settings().inline_literals {
        LiteralMode::Inline
    } else {
        LiteralMode::Bind
    };
    resolve_part_with_mode(ctx, part, mode)
}

pub(crate) fn resolve_part_with_mode(
    ctx: &QueryContext<'_>,
    part: &FilterPart,
    mode: LiteralMode,
) -> Result<ResolvedFilter> {
    let mut renderer = Renderer::new(ctx.backend(), mode);
    let mut postprocessors = Vec::new();
    part.render(ctx, &mut renderer, &mut postprocessors)?;
    Ok(ResolvedFilter {
        statement: renderer.finish(),
        postprocessors,
    })
}

fn resolve_registration(
    ctx: &QueryContext<'_>,
    registration: &PostProcessorRegistration,
) -> Result<Option<ResolvedPostProcessor>> {
    let name = registration
        .name
        .evaluate(ctx, ValueType::String)?
        .to_text();
    let name = name.trim();
    if name.is_empty() {
        warn!("filter() was given a blank postprocessor name, ignoring it");
        return Ok(None);
    }

    let processor = ctx
        .postprocessors()
        .create(name)
        .ok_or_else(|| ExpressionError::UnknownPostProcessor(name.to_string()))?;
    let data = registration
        .data
        .as_ref()
        .map(|data| data.evaluate(ctx, ValueType::Any))
        .transpose()?;

    Ok(Some(ResolvedPostProcessor {
        name: name.to_string(),
        processor,
        data,
    }))
}
