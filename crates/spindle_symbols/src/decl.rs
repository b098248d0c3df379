//! The declaration tree: a tagged-variant sum type over declaration kinds.

use crate::lookup::LookupKey;
use spindle_common::Ident;

/// A top-level or nested declaration in a source file.
///
/// Declarations form a tree: classes contain member declarations. The tree is
/// deliberately a sum type with a generic [`walk`](Declaration::walk) rather
/// than a polymorphic class hierarchy with double-dispatch visitors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    /// A class, interface, or object declaration.
    Class(ClassDecl),
    /// A function declaration.
    Function(FunctionDecl),
    /// A property declaration.
    Property(PropertyDecl),
}

/// A class-like declaration with optional supertypes and members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    /// The simple name of the class.
    pub name: Ident,
    /// Whether the class is sealed (a closed hierarchy whose membership
    /// exhaustiveness-dependent generators care about).
    pub is_sealed: bool,
    /// Fully qualified supertypes this class extends or implements.
    pub super_types: Vec<LookupKey>,
    /// Annotation simple names applied to this class.
    pub annotations: Vec<Ident>,
    /// Nested member declarations.
    pub members: Vec<Declaration>,
}

/// A function declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    /// The simple name of the function.
    pub name: Ident,
    /// Annotation simple names applied to this function.
    pub annotations: Vec<Ident>,
}

/// A property declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDecl {
    /// The simple name of the property.
    pub name: Ident,
    /// Annotation simple names applied to this property.
    pub annotations: Vec<Ident>,
}

impl Declaration {
    /// Returns the simple name of this declaration.
    pub fn name(&self) -> Ident {
        match self {
            Declaration::Class(c) => c.name,
            Declaration::Function(f) => f.name,
            Declaration::Property(p) => p.name,
        }
    }

    /// Returns the annotation names applied to this declaration.
    pub fn annotations(&self) -> &[Ident] {
        match self {
            Declaration::Class(c) => &c.annotations,
            Declaration::Function(f) => &f.annotations,
            Declaration::Property(p) => &p.annotations,
        }
    }

    /// Visits this declaration and every nested declaration, depth first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Declaration)) {
        f(self);
        if let Declaration::Class(c) = self {
            for member in &c.members {
                member.walk(f);
            }
        }
    }

    /// Folds over this declaration and every nested declaration, depth first.
    pub fn fold<T>(&self, init: T, f: &mut impl FnMut(T, &Declaration) -> T) -> T {
        let mut acc = f(init, self);
        if let Declaration::Class(c) = self {
            for member in &c.members {
                acc = member.fold(acc, f);
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_common::Interner;

    fn class(interner: &Interner, name: &str, members: Vec<Declaration>) -> Declaration {
        Declaration::Class(ClassDecl {
            name: interner.get_or_intern(name),
            is_sealed: false,
            super_types: Vec::new(),
            annotations: Vec::new(),
            members,
        })
    }

    fn function(interner: &Interner, name: &str) -> Declaration {
        Declaration::Function(FunctionDecl {
            name: interner.get_or_intern(name),
            annotations: Vec::new(),
        })
    }

    #[test]
    fn walk_visits_nested() {
        let interner = Interner::new();
        let tree = class(
            &interner,
            "Outer",
            vec![
                function(&interner, "method"),
                class(&interner, "Inner", vec![function(&interner, "deep")]),
            ],
        );

        let mut names = Vec::new();
        tree.walk(&mut |d| names.push(interner.resolve(d.name()).to_string()));
        assert_eq!(names, vec!["Outer", "method", "Inner", "deep"]);
    }

    #[test]
    fn fold_counts_declarations() {
        let interner = Interner::new();
        let tree = class(
            &interner,
            "Outer",
            vec![function(&interner, "a"), function(&interner, "b")],
        );
        let count = tree.fold(0usize, &mut |acc, _| acc + 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn name_and_annotations() {
        let interner = Interner::new();
        let ann = interner.get_or_intern("Database");
        let decl = Declaration::Property(PropertyDecl {
            name: interner.get_or_intern("field"),
            annotations: vec![ann],
        });
        assert_eq!(interner.resolve(decl.name()), "field");
        assert_eq!(decl.annotations(), &[ann]);
    }
}
