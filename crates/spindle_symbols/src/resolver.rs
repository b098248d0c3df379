//! The read-only resolver view handed to processors each round.

use crate::decl::{ClassDecl, Declaration};
use crate::file::SourceFile;
use crate::lookup::LookupKey;
use spindle_common::Interner;
use std::fmt;
use std::path::PathBuf;

/// A stable reference to a declaration, usable across rounds.
///
/// Deferred symbols are carried between rounds as `SymbolRef`s, so they must
/// not borrow from the per-round symbol view.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SymbolRef {
    /// The file the declaration lives in.
    pub file: PathBuf,
    /// The scoped name of the declaration.
    pub key: LookupKey,
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.file.display())
    }
}

/// The symbol view for one processing round.
///
/// Holds the files selected for processing this build (dirty plus generated;
/// clean files are excluded) and the subset that is new this round. All
/// queries are read-only walks over the declaration trees; the resolver
/// never mutates engine state.
pub struct Resolver<'a> {
    files: Vec<&'a SourceFile>,
    new_files: Vec<&'a SourceFile>,
    interner: &'a Interner,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given processing view.
    pub fn new(
        files: Vec<&'a SourceFile>,
        new_files: Vec<&'a SourceFile>,
        interner: &'a Interner,
    ) -> Self {
        Self {
            files,
            new_files,
            interner,
        }
    }

    /// Returns the files that are new in the current round.
    pub fn new_files(&self) -> &[&'a SourceFile] {
        &self.new_files
    }

    /// Returns every file in the processing view.
    pub fn all_files(&self) -> &[&'a SourceFile] {
        &self.files
    }

    /// Returns the interner used to resolve names in the declaration trees.
    pub fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// Returns references to all declarations in new files carrying the given
    /// annotation, in file order.
    ///
    /// Processors drive their per-round work from this query; restricting it
    /// to new files is what makes later rounds cheap.
    pub fn symbols_with_annotation(&self, annotation: &str) -> Vec<SymbolRef> {
        let Some(annotation) = self.interner.get(annotation) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        for file in &self.new_files {
            let package = self.interner.resolve(file.package);
            for decl in &file.declarations {
                decl.walk(&mut |d| {
                    if d.annotations().contains(&annotation) {
                        result.push(SymbolRef {
                            file: file.path.clone(),
                            key: LookupKey::new(
                                package,
                                self.interner.resolve(d.name()),
                            ),
                        });
                    }
                });
            }
        }
        result
    }

    /// Finds a top-level class declaration by scoped name across the whole
    /// processing view, returning the declaring file and the declaration.
    pub fn class_declaration(&self, key: &LookupKey) -> Option<(&'a SourceFile, &'a ClassDecl)> {
        for file in &self.files {
            if self.interner.resolve(file.package) != key.scope {
                continue;
            }
            for decl in &file.declarations {
                if let Declaration::Class(c) = decl {
                    if self.interner.resolve(c.name) == key.name {
                        return Some((file, c));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{ClassDecl, FunctionDecl};

    fn make_file(
        interner: &Interner,
        path: &str,
        class_name: &str,
        annotation: Option<&str>,
    ) -> SourceFile {
        let mut file = SourceFile::new(path, interner.get_or_intern("com.example"));
        file.declarations.push(Declaration::Class(ClassDecl {
            name: interner.get_or_intern(class_name),
            is_sealed: false,
            super_types: Vec::new(),
            annotations: annotation
                .map(|a| vec![interner.get_or_intern(a)])
                .unwrap_or_default(),
            members: vec![Declaration::Function(FunctionDecl {
                name: interner.get_or_intern("method"),
                annotations: Vec::new(),
            })],
        }));
        file
    }

    #[test]
    fn symbols_with_annotation_scans_new_files_only() {
        let interner = Interner::new();
        let annotated_new = make_file(&interner, "src/A.kt", "Foo", Some("Entity"));
        let annotated_old = make_file(&interner, "src/B.kt", "Bar", Some("Entity"));

        let resolver = Resolver::new(
            vec![&annotated_new, &annotated_old],
            vec![&annotated_new],
            &interner,
        );
        let symbols = resolver.symbols_with_annotation("Entity");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].key, LookupKey::new("com.example", "Foo"));
        assert_eq!(symbols[0].file, PathBuf::from("src/A.kt"));
    }

    #[test]
    fn unknown_annotation_matches_nothing() {
        let interner = Interner::new();
        let file = make_file(&interner, "src/A.kt", "Foo", Some("Entity"));
        let resolver = Resolver::new(vec![&file], vec![&file], &interner);
        assert!(resolver.symbols_with_annotation("Missing").is_empty());
    }

    #[test]
    fn class_declaration_searches_all_files() {
        let interner = Interner::new();
        let new = make_file(&interner, "src/A.kt", "Foo", None);
        let old = make_file(&interner, "src/B.kt", "Bar", None);
        let resolver = Resolver::new(vec![&new, &old], vec![&new], &interner);

        let (file, class) = resolver
            .class_declaration(&LookupKey::new("com.example", "Bar"))
            .unwrap();
        assert_eq!(file.path, PathBuf::from("src/B.kt"));
        assert_eq!(interner.resolve(class.name), "Bar");
    }

    #[test]
    fn class_declaration_respects_scope() {
        let interner = Interner::new();
        let file = make_file(&interner, "src/A.kt", "Foo", None);
        let resolver = Resolver::new(vec![&file], vec![&file], &interner);
        assert!(resolver
            .class_declaration(&LookupKey::new("other.pkg", "Foo"))
            .is_none());
    }

    #[test]
    fn symbol_ref_display() {
        let r = SymbolRef {
            file: PathBuf::from("src/A.kt"),
            key: LookupKey::new("com.example", "Foo"),
        };
        assert_eq!(format!("{r}"), "com.example.Foo (src/A.kt)");
    }
}
