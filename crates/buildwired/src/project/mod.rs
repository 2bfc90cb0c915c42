//! In-memory build project that commands run against.
//!
//! A [`Project`] holds named targets with dependencies, string properties and
//! references. Running a target first runs its dependencies, each at most once,
//! and fires [`BuildEvent`]s to the listeners attached by the calling thread.

mod errors;
mod file;
mod listener;
mod target;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use buildwire_protocol::{BuildEvent, Priority, RunBuild};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

pub use self::errors::ProjectError;
use self::file::ProjectFile;
pub use self::listener::{BuildListener, EventLog, ListenerGuard};
use self::listener::ListenerRegistry;
pub use self::target::Target;
use self::target::expand;

const PROJECT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::project");

/// Build project shared by every connection of a server.
pub struct Project {
    base_dir: Utf8PathBuf,
    project_file: Option<Utf8PathBuf>,
    definition: RwLock<Definition>,
    listeners: ListenerRegistry,
}

impl Project {
    /// Creates an empty project rooted at `base_dir`.
    #[must_use]
    pub fn new(name: impl Into<String>, base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self::from_definition(
            Definition {
                name: name.into(),
                ..Definition::default()
            },
            base_dir.into(),
            None,
        )
    }

    /// Loads a project from a TOML project file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or defines a
    /// target twice.
    pub fn load(path: &Utf8Path, base_dir: impl Into<Utf8PathBuf>) -> Result<Self, ProjectError> {
        let definition = Definition::from_file(ProjectFile::read(path)?, path)?;
        Ok(Self::from_definition(
            definition,
            base_dir.into(),
            Some(path.to_owned()),
        ))
    }

    fn from_definition(
        definition: Definition,
        base_dir: Utf8PathBuf,
        project_file: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            base_dir,
            project_file,
            definition: RwLock::new(definition),
            listeners: ListenerRegistry::default(),
        }
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    /// Directory that relative command paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// File the project was loaded from, if any.
    #[must_use]
    pub fn project_file(&self) -> Option<&Utf8Path> {
        self.project_file.as_deref()
    }

    /// Registers a target.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::DuplicateTarget`] if the name is taken.
    pub fn add_target(&self, target: Target) -> Result<(), ProjectError> {
        self.write().insert(target)
    }

    /// Sets the target run when none is named.
    pub fn set_default_target(&self, target: impl Into<String>) {
        self.write().default_target = Some(target.into());
    }

    /// Sets a property.
    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().properties.insert(name.into(), value.into());
    }

    /// Reads a property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<String> {
        self.read().properties.get(name).cloned()
    }

    /// Sets a reference.
    pub fn set_reference(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().references.insert(name.into(), value.into());
    }

    /// Attaches a listener for the calling thread until the guard drops.
    pub fn attach(&self, listener: Arc<dyn BuildListener>) -> ListenerGuard<'_> {
        self.listeners.attach(listener)
    }

    /// Number of listeners currently attached across all threads.
    #[must_use]
    pub fn attached_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Runs `target` and its dependencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is unknown, its dependencies loop, or
    /// any target in the plan fails.
    pub fn execute_target(&self, target: &str) -> Result<(), ProjectError> {
        let definition = self.read();
        definition.run(Some(target), &|event| self.listeners.fire(event))
    }

    /// Runs a sub-build assembled from a project file and this project's
    /// state.
    ///
    /// The sub-build starts from the file's own properties. With
    /// `inherit_all` the parent's properties are laid over them; the
    /// explicit overrides in `build.properties` always win. References named
    /// in `build.references` are copied, as are all parent references with
    /// `inherit_refs`. Events fire to the caller's listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded, a named reference does
    /// not exist, or the sub-build fails.
    pub fn run_sub_build(&self, build: &RunBuild) -> Result<(), ProjectError> {
        let path = match &build.build_file {
            Some(file) => self.base_dir.join(file),
            None => self.project_file.clone().ok_or(ProjectError::NoProjectFile)?,
        };
        let mut child = Definition::from_file(ProjectFile::read(&path)?, &path)?;
        {
            let parent = self.read();
            if build.inherit_all {
                child.properties.extend(parent.properties.clone());
            }
            if build.inherit_refs {
                child.references.extend(parent.references.clone());
            }
            for name in &build.references {
                let value = parent.references.get(name).cloned().ok_or_else(|| {
                    ProjectError::UnknownReference {
                        reference: name.clone(),
                    }
                })?;
                child.references.insert(name.clone(), value);
            }
        }
        child.properties.extend(build.properties.clone());
        debug!(
            target: PROJECT_TARGET,
            file = %path,
            project = %child.name,
            target = build.target.as_deref().unwrap_or("<default>"),
            "running sub-build"
        );
        child.run(build.target.as_deref(), &|event| self.listeners.fire(event))
    }

    fn read(&self) -> RwLockReadGuard<'_, Definition> {
        self.definition.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Definition> {
        self.definition.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Default)]
struct Definition {
    name: String,
    default_target: Option<String>,
    targets: BTreeMap<String, Target>,
    properties: BTreeMap<String, String>,
    references: BTreeMap<String, String>,
}

impl Definition {
    fn from_file(file: ProjectFile, path: &Utf8Path) -> Result<Self, ProjectError> {
        let mut definition = Self {
            name: file.name_or(path),
            default_target: file.default,
            targets: BTreeMap::new(),
            properties: file.properties,
            references: file.references,
        };
        for target in file.targets {
            definition.insert(target)?;
        }
        Ok(definition)
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name.strip_prefix("ref:") {
            Some(reference) => self.references.get(reference),
            None => self.properties.get(name),
        }
        .map(String::as_str)
    }

    fn insert(&mut self, target: Target) -> Result<(), ProjectError> {
        if self.targets.contains_key(&target.name) {
            return Err(ProjectError::DuplicateTarget {
                target: target.name,
            });
        }
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// Orders `requested` after its transitive dependencies.
    fn plan(&self, requested: Option<&str>) -> Result<Vec<&Target>, ProjectError> {
        let root = requested
            .or(self.default_target.as_deref())
            .ok_or_else(|| ProjectError::NoDefaultTarget {
                project: self.name.clone(),
            })?;
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        self.visit(root, &mut path, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<&'a Target>,
    ) -> Result<(), ProjectError> {
        if done.contains(name) {
            return Ok(());
        }
        if path.iter().any(|entry| entry == name) {
            return Err(ProjectError::DependencyCycle {
                target: name.to_owned(),
            });
        }
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| ProjectError::UnknownTarget {
                project: self.name.clone(),
                target: name.to_owned(),
            })?;
        path.push(name.to_owned());
        for dependency in &target.depends {
            self.visit(dependency, path, done, order)?;
        }
        path.pop();
        done.insert(name.to_owned());
        order.push(target);
        Ok(())
    }

    fn run(
        &self,
        requested: Option<&str>,
        fire: &dyn Fn(&BuildEvent),
    ) -> Result<(), ProjectError> {
        let plan = self.plan(requested)?;
        fire(&BuildEvent::BuildStarted {
            project: self.name.clone(),
        });
        let result = plan.into_iter().try_for_each(|target| self.run_one(target, fire));
        fire(&BuildEvent::BuildFinished {
            project: self.name.clone(),
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }

    fn run_one(&self, target: &Target, fire: &dyn Fn(&BuildEvent)) -> Result<(), ProjectError> {
        fire(&BuildEvent::TargetStarted {
            target: target.name.clone(),
        });
        for line in &target.echo {
            fire(&BuildEvent::Message {
                target: Some(target.name.clone()),
                priority: Priority::Info,
                text: expand(line, |name| self.lookup(name)),
            });
        }
        let error = target
            .fail
            .as_ref()
            .map(|message| expand(message, |name| self.lookup(name)));
        if let Some(message) = &error {
            fire(&BuildEvent::Message {
                target: Some(target.name.clone()),
                priority: Priority::Error,
                text: message.clone(),
            });
        }
        fire(&BuildEvent::TargetFinished {
            target: target.name.clone(),
            error: error.clone(),
        });
        match error {
            Some(message) => Err(ProjectError::TargetFailed {
                target: target.name.clone(),
                message,
            }),
            None => Ok(()),
        }
    }
}
