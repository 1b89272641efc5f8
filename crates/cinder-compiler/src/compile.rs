//! Speculative compilation of one chunk against the session.
//!
//! Every attempt starts with fresh transient state: its own diagnostics,
//! undo log and binder caches. The session is only changed through the
//! undo log until the attempt fully succeeds, at which point the log is
//! discarded and the unit's usings, types and fields are committed.

use std::sync::Arc;

use cinder_eval::PrintHandlerImpl;
use cinder_lexer::Lexer;
use cinder_parser::{parse_declarations, parse_statements, ParseResult};
use cinder_types::{CinderError, CompileErrors, ErrorCode, SourceFile};
use tracing::{debug, info, warn};

use crate::binder::{BindOutput, Binder};
use crate::disambiguate::Classification;
use crate::image::ProgramImage;
use crate::registry::FieldRegistry;
use crate::undo::UndoLog;
use crate::unit::{CompiledUnit, UnitKind};

/// Durable state shared by every evaluation.
#[derive(Debug, Default)]
pub struct Session {
    pub image: ProgramImage,
    pub registry: FieldRegistry,
    units: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units compiled successfully so far.
    pub fn units_compiled(&self) -> u64 {
        self.units
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Input that ends early is reported as partial; nothing is printed.
    Silent,
    /// Every diagnostic is written to the sink.
    ReportErrors,
}

#[derive(Debug)]
pub enum CompileOutcome {
    Unit(CompiledUnit),
    /// More text is needed.
    Partial,
    /// Classification or parse failure; the image was never touched.
    Syntax(CompileErrors),
    /// Binding failure; the undo log has been replayed.
    Resolution(CompileErrors),
}

pub struct SpeculativeCompiler<'s> {
    session: &'s mut Session,
    sink: &'s PrintHandlerImpl,
}

impl<'s> SpeculativeCompiler<'s> {
    pub fn new(session: &'s mut Session, sink: &'s PrintHandlerImpl) -> Self {
        Self { session, sink }
    }

    #[tracing::instrument(skip_all, fields(file = %source.name, ?classification, ?mode))]
    pub fn compile(
        &mut self,
        source: &SourceFile,
        classification: Classification,
        mode: ParseMode,
    ) -> CompileOutcome {
        match classification {
            Classification::EndOfInput => CompileOutcome::Partial,
            Classification::Invalid => {
                let errors = invalid_start(source);
                self.report(&errors, mode);
                CompileOutcome::Syntax(errors)
            }
            Classification::StatementOrExpression => {
                let unit = match self.check_parse(parse_statements(source), mode) {
                    Ok(unit) => unit,
                    Err(outcome) => return outcome,
                };
                self.bind(source, UnitKind::Statements, |binder| {
                    binder.bind_statements(&unit)
                })
            }
            Classification::DeclarationUnit => {
                let unit = match self.check_parse(parse_declarations(source), mode) {
                    Ok(unit) => unit,
                    Err(outcome) => return outcome,
                };
                self.bind(source, UnitKind::Declarations, |binder| {
                    binder.bind_declarations(&unit)
                })
            }
        }
    }

    fn check_parse<T>(&self, parsed: ParseResult<T>, mode: ParseMode) -> Result<T, CompileOutcome> {
        if parsed.errors.has_errors() {
            if mode == ParseMode::Silent && parsed.is_partial() {
                debug!("input ends early");
                return Err(CompileOutcome::Partial);
            }
            self.report(&parsed.errors, mode);
            return Err(CompileOutcome::Syntax(parsed.errors));
        }
        match parsed.unit {
            Some(unit) => Ok(unit),
            None => Err(CompileOutcome::Syntax(parsed.errors)),
        }
    }

    fn bind<F>(&mut self, source: &SourceFile, kind: UnitKind, run: F) -> CompileOutcome
    where
        F: for<'b> FnOnce(Binder<'b>) -> Option<BindOutput>,
    {
        let mut undo = UndoLog::new();
        let mut errors = CompileErrors::empty();
        let output = {
            let Session {
                image, registry, ..
            } = &mut *self.session;
            run(Binder::new(image, registry, &mut undo, &mut errors, source))
        };

        let output = match output {
            Some(output) if !errors.has_errors() => output,
            _ => {
                self.report(&errors, ParseMode::ReportErrors);
                warn!(
                    errors = errors.total_errors,
                    undone = undo.len(),
                    "compile failed, rolling back"
                );
                undo.execute_undo(&mut self.session.image);
                return CompileOutcome::Resolution(errors);
            }
        };

        undo.discard();
        self.session.image.commit(output.commit);
        let new_fields = output.fields.len();
        for field in output.fields {
            self.session
                .registry
                .register(&field.name, field.handle, field.readonly);
        }
        self.session.units += 1;

        let name = format!("<unit{}>", self.session.units);
        let unit = CompiledUnit::new(name, kind, Arc::new(output.code), &source.source);
        info!(
            unit = unit.name(),
            fingerprint = unit.fingerprint(),
            ?kind,
            fields = new_fields,
            "compiled"
        );
        CompileOutcome::Unit(unit)
    }

    fn report(&self, errors: &CompileErrors, mode: ParseMode) {
        if mode == ParseMode::Silent {
            return;
        }
        for error in &errors.errors {
            self.sink.println(&error.render());
        }
    }
}

/// Diagnostics for a chunk whose first token can never start a unit.
fn invalid_start(source: &SourceFile) -> CompileErrors {
    let mut lexer = Lexer::new(source);
    let first = lexer.next_token();
    let lexed = lexer.into_errors();
    if lexed.has_errors() {
        return lexed;
    }
    let line = source.snippet(first.span);
    let mut errors = CompileErrors::empty();
    errors.push_error(CinderError::new(
        &source.name,
        ErrorCode::UNEXPECTED_TOKEN,
        format!("Unexpected symbol '{}'", first.kind),
        first.span,
        line,
    ));
    errors
}

#[cfg(test)]
mod tests {
    use cinder_eval::buffer_handler;

    use super::*;
    use crate::disambiguate::classify;

    fn compile(session: &mut Session, text: &str, mode: ParseMode) -> CompileOutcome {
        let sink = buffer_handler();
        let source = SourceFile::new("test", text);
        let classification = classify(&source);
        SpeculativeCompiler::new(session, &sink).compile(&source, classification, mode)
    }

    #[test]
    fn silent_mode_reports_partial_input() {
        let mut session = Session::new();
        let outcome = compile(&mut session, "if (true) {", ParseMode::Silent);
        assert!(matches!(outcome, CompileOutcome::Partial));
    }

    #[test]
    fn report_mode_turns_partial_input_into_an_error() {
        let mut session = Session::new();
        let outcome = compile(&mut session, "if (true) {", ParseMode::ReportErrors);
        match outcome {
            CompileOutcome::Syntax(errors) => assert!(errors.is_partial_input()),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_start_is_a_syntax_error() {
        let mut session = Session::new();
        let outcome = compile(&mut session, "readonly int x;", ParseMode::Silent);
        match outcome {
            CompileOutcome::Syntax(errors) => {
                assert!(errors.contains(ErrorCode::UNEXPECTED_TOKEN));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn failed_namespace_is_rolled_back() {
        let mut session = Session::new();
        let outcome = compile(
            &mut session,
            "namespace N { class A { int F() { return nope; } } }",
            ParseMode::Silent,
        );
        match outcome {
            CompileOutcome::Resolution(errors) => {
                assert!(errors.contains(ErrorCode::UNKNOWN_NAME));
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
        assert!(!session.image.contains("N"));
        assert!(!session.image.contains("N.A"));
        assert!(session.image.declared_types().is_empty());
        assert_eq!(session.units_compiled(), 0);
    }

    #[test]
    fn success_commits_types_and_fields() {
        let mut session = Session::new();
        let outcome = compile(&mut session, "class Point { int X; }", ParseMode::Silent);
        assert!(matches!(outcome, CompileOutcome::Unit(_)));
        assert_eq!(session.image.declared_types(), vec!["Point".to_string()]);

        let outcome = compile(&mut session, "int z = 5;", ParseMode::Silent);
        match outcome {
            CompileOutcome::Unit(unit) => {
                assert_eq!(unit.kind(), UnitKind::Statements);
                assert_eq!(unit.name(), "<unit2>");
            }
            other => panic!("expected unit, got {other:?}"),
        }
        assert!(session.registry.lookup("z").is_some());
    }

    #[test]
    fn resolution_errors_reach_the_sink_in_silent_mode() {
        let mut session = Session::new();
        let sink = buffer_handler();
        let source = SourceFile::new("test", "undefinedName + 1");
        let mut compiler = SpeculativeCompiler::new(&mut session, &sink);
        let outcome = compiler.compile(&source, classify(&source), ParseMode::Silent);
        assert!(matches!(outcome, CompileOutcome::Resolution(_)));
        assert!(sink.get_output().contains("E200"));
    }
}
