use std::fmt;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    ast::Scheme,
    error::{RuntimeError, SyntaxError, TypeError},
    eval::{eval_top, Env, Value},
    infer::{infer_top, run_inference, InferenceTree, TypeEnv},
    syntax::{parse_expr, parse_program, parse_repl, Decl},
};

const PRELUDE: &str = include_str!("prelude.ml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Load the standard prelude into a fresh session.
    pub load_prelude: bool,
    /// Refuse to evaluate statements that fail to type check.
    pub strict_types: bool,
    /// Attach the inference derivation to every report.
    pub trace: bool,
    /// Skip failing statements while loading a program instead of stopping.
    pub keep_going: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            load_prelude: true,
            strict_types: true,
            trace: false,
            keep_going: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The outcome of one top-level statement.
#[derive(Debug)]
pub struct Report {
    pub name: Option<String>,
    /// `None` when type checking failed and was ignored.
    pub scheme: Option<Scheme>,
    pub value: Value,
    pub trace: Option<InferenceTree>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "val {}", name)?,
            None => write!(f, "-")?,
        }
        if let Some(scheme) = &self.scheme {
            write!(f, " : {}", scheme)?;
        }
        write!(f, " = {}", self.value)
    }
}

/// Type and value environments accumulated over a sequence of statements.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    types: TypeEnv,
    values: Env,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self {
            config,
            types: TypeEnv::new(),
            values: Env::new(),
        };
        if session.config.load_prelude {
            let reports = session.load(PRELUDE)?;
            info!("loaded prelude ({} definitions)", reports.len());
        }
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs one statement. Either both environments are extended or,
    /// on any error, neither is.
    pub fn run_decl(&mut self, decl: &Decl) -> Result<Report, SessionError> {
        let expr = decl.to_expr();
        debug!("running statement {}", expr);

        let inferred = if self.config.trace {
            run_inference(&self.types, &expr).map(|(scheme, tree)| (scheme, Some(tree)))
        } else {
            infer_top(&self.types, &expr).map(|scheme| (scheme, None))
        };
        let (scheme, trace) = match inferred {
            Ok((scheme, tree)) => (Some(scheme.normalize()), tree),
            Err(err) if self.config.strict_types => return Err(err.into()),
            Err(err) => {
                warn!("ignoring type error: {}", err);
                (None, None)
            }
        };

        let value = eval_top(&self.values, &expr)?;

        let name = decl.name().map(str::to_string);
        if let Some(name) = &name {
            match &scheme {
                Some(scheme) => {
                    self.types.insert(name.clone(), scheme.clone());
                }
                // An earlier type for this name no longer applies
                None => {
                    self.types.remove(name);
                }
            }
            self.values = self.values.extend(name.as_str(), value.clone());
        }

        Ok(Report {
            name,
            scheme,
            value,
            trace,
        })
    }

    /// Parses and runs one REPL statement.
    pub fn run_line(&mut self, src: &str) -> Result<Report, SessionError> {
        let decl = parse_repl(src)?;
        self.run_decl(&decl)
    }

    /// Runs every statement of a program. A syntax error anywhere rejects the
    /// whole program before anything runs.
    pub fn load(&mut self, src: &str) -> Result<Vec<Report>, SessionError> {
        let decls = parse_program(src)?;
        let mut reports = Vec::with_capacity(decls.len());
        for decl in &decls {
            match self.run_decl(decl) {
                Ok(report) => reports.push(report),
                Err(err) if self.config.keep_going => {
                    error!("skipping statement: {}", err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reports)
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<Report>, SessionError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loading {}", path.display());
        self.load(&src)
    }

    /// Infers the type of an expression without evaluating it.
    pub fn type_of(&self, src: &str) -> Result<(Scheme, InferenceTree), SessionError> {
        let expr = parse_expr(src.trim().trim_end_matches(';'))?;
        let (scheme, tree) = run_inference(&self.types, &expr)?;
        Ok((scheme.normalize(), tree))
    }

    /// Bound names in alphabetical order, with their types when known.
    pub fn bindings(&self) -> Vec<(String, Option<Scheme>)> {
        self.values
            .names()
            .into_iter()
            .sorted()
            .map(|name| (name.to_string(), self.types.get(name).cloned()))
            .collect()
    }
}
