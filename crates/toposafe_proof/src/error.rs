//! Proof-check failure modes (§4.5.6, §7 kinds 5 "Bounds error", 6
//! "Assertion error", 7 "Coroutine error", plus 9 "Internal error").
//!
//! Kinds 1-4 and 8 (lex/parse/name/type/topology) are raised upstream by
//! `toposafe-lexer`/`toposafe-parser`/`toposafe-typeck`; this crate only
//! ever produces the three kinds that depend on the fact set, plus an
//! internal-invariant variant so a driver can map it to its own exit
//! status (§7 "Internal errors abort immediately").

use toposafe_base::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// An obligation from §4.5.1 (arithmetic, cast, index, shift,
    /// division, assignment-to-refined-type) could not be discharged
    /// against the fact set known at that point.
    BoundsObligationUnproved {
        obligation: String,
        span: Span,
        facts: Vec<String>,
    },
    /// An explicit `assert`/`pre`/`inv`/`post` (without a `via`, or whose
    /// `via` itself failed) does not follow from the current facts.
    AssertionUnproved {
        expr: String,
        span: Span,
        facts: Vec<String>,
    },
    /// `via "name"(...)` names a rule absent from the rule catalogue
    /// (§4.5.4 "reject an unknown rule name").
    UnknownRule { name: String, span: Span },
    /// A rule's free meta-variable has no substitution in the `via`
    /// invocation (§4.5.4 "require that every meta-variable is supplied
    /// a substitution").
    MissingRuleSubstitution { meta_var: String, rule: String, span: Span },
    /// After substitution, one of the rule's premises matches no fact
    /// (§4.5.4 "on failure, emit a diagnostic naming the unmet premise").
    UnmetPremise { premise: String, rule: String, span: Span },
    /// A `f?(...)` call appears in a function not itself declared `?`
    /// (§4.5.5, §7 "suspension inside a non-? function").
    SuspendOutsideCoroutine { span: Span },
    /// A pointer-typed local is live across a suspension point (§4.5.5
    /// "Pointer-typed locals may not be resumable").
    PointerResumableAcrossSuspension { name: String, span: Span },
    /// An invariant internal to the checker was violated — never caused
    /// by a rejectable input program (§7 kind 9, distinguished from the
    /// user-facing kinds above so a driver can map it to a distinct exit
    /// status).
    Internal { message: String },
}

impl ProofError {
    /// The point in source this diagnostic is anchored to, when it has
    /// one (`Internal` does not, by construction).
    pub fn span(&self) -> Option<Span> {
        match self {
            ProofError::BoundsObligationUnproved { span, .. }
            | ProofError::AssertionUnproved { span, .. }
            | ProofError::UnknownRule { span, .. }
            | ProofError::MissingRuleSubstitution { span, .. }
            | ProofError::UnmetPremise { span, .. }
            | ProofError::SuspendOutsideCoroutine { span }
            | ProofError::PointerResumableAcrossSuspension { span, .. } => Some(*span),
            ProofError::Internal { .. } => None,
        }
    }
}

fn write_facts(f: &mut std::fmt::Formatter<'_>, facts: &[String]) -> std::fmt::Result {
    for fact in facts {
        write!(f, "\n    {fact}")?;
    }
    Ok(())
}

impl std::fmt::Display for ProofError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofError::BoundsObligationUnproved { obligation, span, facts } => {
                write!(f, "obligation '{obligation}' not discharged at {span:?}")?;
                write_facts(f, facts)
            }
            ProofError::AssertionUnproved { expr, span, facts } => {
                write!(f, "cannot prove '{expr}' at {span:?}")?;
                write_facts(f, facts)
            }
            ProofError::UnknownRule { name, span } => {
                write!(f, "unknown via rule '{name}' at {span:?}")
            }
            ProofError::MissingRuleSubstitution { meta_var, rule, span } => {
                write!(f, "rule '{rule}' meta-variable '{meta_var}' has no substitution at {span:?}")
            }
            ProofError::UnmetPremise { premise, rule, span } => {
                write!(f, "rule '{rule}' premise '{premise}' is not a known fact at {span:?}")
            }
            ProofError::SuspendOutsideCoroutine { span } => {
                write!(f, "suspension call outside of a '?'-declared function at {span:?}")
            }
            ProofError::PointerResumableAcrossSuspension { name, span } => {
                write!(f, "pointer-typed local '{name}' is live across a suspension point at {span:?}")
            }
            ProofError::Internal { message } => {
                write!(f, "internal proof-checker invariant violated: {message}")
            }
        }
    }
}

impl std::error::Error for ProofError {}

pub type Result<T> = std::result::Result<T, ProofError>;
