//! Unit registry: the ordered list of named work units.
//!
//! A [`Unit`] declares the units it must run after, the target tables it
//! populates, and the target tables it reads. [`UnitRegistry::register`]
//! validates each declaration eagerly, so a declaration-order mistake is
//! reported at startup before any database work happens.
//!
//! Registration order is the execution order. A predecessor can only be
//! named once it exists, which rules out forward references and cycles;
//! [`UnitRegistry::verify_order`] re-checks the frozen registry with a full
//! topological sort.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::RunConfig;
use crate::error::{ImportError, ImportResult};
use crate::target::TargetSchema;

/// What a unit body sees besides the target handle.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    config: &'a RunConfig,
    declared_tables: &'a BTreeSet<String>,
    ignored_tables: &'a BTreeSet<String>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a RunConfig,
        declared_tables: &'a BTreeSet<String>,
        ignored_tables: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            config,
            declared_tables,
            ignored_tables,
        }
    }

    pub fn config(&self) -> &'a RunConfig {
        self.config
    }

    /// Tables populated by some registered unit.
    pub fn declared_tables(&self) -> &'a BTreeSet<String> {
        self.declared_tables
    }

    /// Tables deliberately left empty.
    pub fn ignored_tables(&self) -> &'a BTreeSet<String> {
        self.ignored_tables
    }
}

/// The action a unit performs against the target.
#[async_trait]
pub trait UnitBody<T: TargetSchema + ?Sized>: Send + Sync {
    async fn run(&self, target: &mut T, ctx: &RunContext<'_>) -> ImportResult<()>;
}

/// One named, orderable step of an import.
pub struct Unit<T: TargetSchema + ?Sized> {
    name: String,
    after: Vec<String>,
    populates: BTreeSet<String>,
    reads: BTreeSet<String>,
    body: Box<dyn UnitBody<T>>,
}

impl<T: TargetSchema + ?Sized> Unit<T> {
    /// A unit with no predecessors that populates nothing.
    pub fn new(name: impl Into<String>, body: impl UnitBody<T> + 'static) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
            populates: BTreeSet::new(),
            reads: BTreeSet::new(),
            body: Box::new(body),
        }
    }

    /// Units that must have run before this one.
    pub fn after<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for unit in units {
            let unit = unit.into();
            if !self.after.contains(&unit) {
                self.after.push(unit);
            }
        }
        self
    }

    /// Target tables this unit is responsible for filling.
    pub fn populates<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populates.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Target tables this unit joins against, which must already be filled.
    pub fn reads<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.after
    }

    pub fn tables(&self) -> &BTreeSet<String> {
        &self.populates
    }

    pub fn reads_tables(&self) -> &BTreeSet<String> {
        &self.reads
    }

    pub(crate) fn body(&self) -> &dyn UnitBody<T> {
        self.body.as_ref()
    }
}

impl<T: TargetSchema + ?Sized> std::fmt::Debug for Unit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("after", &self.after)
            .field("populates", &self.populates)
            .field("reads", &self.reads)
            .finish_non_exhaustive()
    }
}

/// A step of the resolved plan, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub position: usize,
    pub name: String,
    pub after: Vec<String>,
    pub populates: Vec<String>,
    pub reads: Vec<String>,
}

/// Ordered collection of units plus the bookkeeping for coverage checks.
pub struct UnitRegistry<T: TargetSchema + ?Sized> {
    units: Vec<Unit<T>>,
    /// unit name → registration index
    positions: HashMap<String, usize>,
    /// unit name → every unit it transitively runs after
    ancestors: HashMap<String, BTreeSet<String>>,
    /// table → owning unit
    owners: BTreeMap<String, String>,
    declared: BTreeSet<String>,
    ignored: BTreeSet<String>,
}

impl<T: TargetSchema + ?Sized> UnitRegistry<T> {
    /// Create an empty registry with the tables intentionally left empty.
    pub fn new<I, S>(ignored_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            units: Vec::new(),
            positions: HashMap::new(),
            ancestors: HashMap::new(),
            owners: BTreeMap::new(),
            declared: BTreeSet::new(),
            ignored: ignored_tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a unit.
    ///
    /// Fails without modifying the registry if the name is taken, a
    /// predecessor is unknown, a populated table already has an owner, or a
    /// read table is not populated by a unit this one runs after.
    pub fn register(&mut self, unit: Unit<T>) -> ImportResult<&mut Self> {
        if self.positions.contains_key(unit.name()) {
            return Err(ImportError::DuplicateUnit {
                unit: unit.name.clone(),
            });
        }

        let mut ancestors = BTreeSet::new();
        for dependency in &unit.after {
            let inherited =
                self.ancestors
                    .get(dependency)
                    .ok_or_else(|| ImportError::DependencyOrder {
                        unit: unit.name.clone(),
                        missing: dependency.clone(),
                    })?;
            ancestors.extend(inherited.iter().cloned());
            ancestors.insert(dependency.clone());
        }

        if let Some((table, owner)) = unit
            .populates
            .iter()
            .find_map(|table| self.owners.get(table).map(|owner| (table, owner)))
        {
            return Err(ImportError::DuplicateTableOwner {
                table: table.clone(),
                owner: owner.clone(),
                unit: unit.name.clone(),
            });
        }

        for table in &unit.reads {
            let satisfied = self
                .owners
                .get(table)
                .is_some_and(|owner| ancestors.contains(owner));
            if !satisfied {
                return Err(ImportError::UnsatisfiedRead {
                    unit: unit.name.clone(),
                    table: table.clone(),
                });
            }
        }

        for table in &unit.populates {
            self.owners.insert(table.clone(), unit.name.clone());
            self.declared.insert(table.clone());
        }
        self.positions.insert(unit.name.clone(), self.units.len());
        self.ancestors.insert(unit.name.clone(), ancestors);
        self.units.push(unit);
        Ok(self)
    }

    pub fn units(&self) -> &[Unit<T>] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Tables populated by registered units.
    pub fn declared_tables(&self) -> &BTreeSet<String> {
        &self.declared
    }

    /// Tables deliberately left empty.
    pub fn ignored_tables(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    /// Unit responsible for `table`, if any.
    pub fn owner_of(&self, table: &str) -> Option<&str> {
        self.owners.get(table).map(String::as_str)
    }

    /// Names of the units owning any of `tables`, in registration order.
    pub fn owners_of<'a, I>(&self, tables: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut owners: Vec<&str> = tables
            .into_iter()
            .filter_map(|table| self.owner_of(table))
            .collect();
        owners.sort_by_key(|name| self.positions[*name]);
        owners.dedup();
        owners.into_iter().map(str::to_string).collect()
    }

    /// Re-derive an execution order with Kahn's algorithm, breaking ties by
    /// registration index, and check it matches the registration order.
    ///
    /// Registration order is a valid topological order exactly when the
    /// two agree.
    pub fn verify_order(&self) -> ImportResult<()> {
        let mut in_degree = vec![0usize; self.units.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.units.len()];

        for (index, unit) in self.units.iter().enumerate() {
            for dependency in &unit.after {
                let &dep_index =
                    self.positions
                        .get(dependency)
                        .ok_or_else(|| ImportError::DependencyOrder {
                            unit: unit.name.clone(),
                            missing: dependency.clone(),
                        })?;
                dependents[dep_index].push(index);
                in_degree[index] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut position = 0;
        while let Some(Reverse(index)) = ready.pop() {
            if index != position {
                break;
            }
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
            position += 1;
        }

        if position == self.units.len() {
            return Ok(());
        }

        let unit = &self.units[position];
        let missing = unit
            .after
            .iter()
            .find(|dependency| self.positions[dependency.as_str()] >= position)
            .cloned()
            .unwrap_or_default();
        Err(ImportError::DependencyOrder {
            unit: unit.name.clone(),
            missing,
        })
    }

    /// The resolved plan in execution order.
    pub fn plan(&self) -> Vec<PlanStep> {
        self.units
            .iter()
            .enumerate()
            .map(|(position, unit)| PlanStep {
                position,
                name: unit.name.clone(),
                after: unit.after.clone(),
                populates: unit.populates.iter().cloned().collect(),
                reads: unit.reads.iter().cloned().collect(),
            })
            .collect()
    }
}

impl<T: TargetSchema + ?Sized> std::fmt::Debug for UnitRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.units)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}
