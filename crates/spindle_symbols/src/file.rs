//! Source files and the symbol/reference facts they carry.

use crate::decl::Declaration;
use crate::lookup::LookupKey;
use spindle_common::{Ident, Interner};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A source file as seen by the engine: a stable project-relative path, the
/// declarations it contains, and the references the host compiler's
/// resolution recorded while analyzing it.
///
/// Identity across builds is the relative path. The `is_new` flag marks files
/// selected for processing in the current round (the dirty set on round one,
/// freshly generated files on later rounds).
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Project-relative path; the stable identity of this file.
    pub path: PathBuf,
    /// The package this file belongs to.
    pub package: Ident,
    /// Top-level declarations in this file.
    pub declarations: Vec<Declaration>,
    /// Symbol-level references ("this file uses member `scope.name`")
    /// reported by the resolution oracle.
    pub symbol_references: Vec<LookupKey>,
    /// Class-level references ("this file uses class `scope.name`")
    /// reported by the resolution oracle.
    pub class_references: Vec<LookupKey>,
    /// Whether this file is new in the current round.
    pub is_new: bool,
}

impl SourceFile {
    /// Creates a source file with no declarations or references.
    pub fn new(path: impl Into<PathBuf>, package: Ident) -> Self {
        Self {
            path: path.into(),
            package,
            declarations: Vec::new(),
            symbol_references: Vec::new(),
            class_references: Vec::new(),
            is_new: false,
        }
    }

    /// Returns the lookup keys of every symbol this file declares.
    ///
    /// Top-level declarations are scoped by the file's package; members of a
    /// class are scoped by the fully qualified class name. This is the set
    /// recorded in the symbols map and diffed across builds to find files
    /// affected by a change.
    pub fn declared_symbols(&self, interner: &Interner) -> BTreeSet<LookupKey> {
        let package = interner.resolve(self.package).to_string();
        let mut symbols = BTreeSet::new();
        for decl in &self.declarations {
            collect_symbols(decl, &package, interner, &mut symbols);
        }
        symbols
    }

    /// Returns the sealed hierarchies this file contributes members to.
    ///
    /// Covers sealed classes declared here (the hierarchy root itself) and
    /// the supertypes of every class declared here (membership edges). When
    /// this set changes across builds, files that recorded a class-level
    /// lookup of one of these hierarchies must be reprocessed, since
    /// exhaustiveness-dependent generated code may be invalid.
    pub fn sealed_memberships(&self, interner: &Interner) -> BTreeSet<LookupKey> {
        let package = interner.resolve(self.package).to_string();
        let mut memberships = BTreeSet::new();
        for decl in &self.declarations {
            decl.walk(&mut |d| {
                if let Declaration::Class(c) = d {
                    if c.is_sealed {
                        memberships
                            .insert(LookupKey::new(package.as_str(), interner.resolve(c.name)));
                    }
                    for super_type in &c.super_types {
                        memberships.insert(super_type.clone());
                    }
                }
            });
        }
        memberships
    }
}

fn collect_symbols(
    decl: &Declaration,
    scope: &str,
    interner: &Interner,
    out: &mut BTreeSet<LookupKey>,
) {
    let name = interner.resolve(decl.name());
    out.insert(LookupKey::new(scope, name));
    if let Declaration::Class(c) = decl {
        let nested_scope = format!("{scope}.{name}");
        for member in &c.members {
            collect_symbols(member, &nested_scope, interner, out);
        }
    }
}
