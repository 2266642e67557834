//! The lexical language frontends.
//!
//! Each module implements [`tangle_core::parser::LanguageParser`] for one
//! language. Registration order matters for the shared `.h` extension: the
//! Objective-C frontend claims it before the C and C++ frontends, matching
//! the permitted-language precedence.

pub mod c;
pub mod cpp;
pub mod go;
pub mod groovy;
pub mod java;
pub mod javascript;
pub mod kotlin;
pub mod objc;
pub mod python;
pub mod ruby;
pub mod support;
pub mod swift;
pub mod typescript;

pub use c::CParser;
pub use cpp::CppParser;
pub use go::GoParser;
pub use groovy::GroovyParser;
pub use java::JavaParser;
pub use javascript::JavaScriptParser;
pub use kotlin::KotlinParser;
pub use objc::ObjCParser;
pub use python::PythonParser;
pub use ruby::RubyParser;
pub use swift::SwiftParser;
pub use typescript::TypeScriptParser;

use tangle_core::parser::LanguageParser;

/// One instance of every frontend, in extension-claim precedence order.
pub fn all_parsers() -> Vec<Box<dyn LanguageParser>> {
    vec![
        Box::new(JavaParser::new()),
        Box::new(KotlinParser::new()),
        Box::new(GroovyParser::new()),
        Box::new(ObjCParser::new()),
        Box::new(CParser::new()),
        Box::new(CppParser::new()),
        Box::new(JavaScriptParser::new()),
        Box::new(TypeScriptParser::new()),
        Box::new(SwiftParser::new()),
        Box::new(RubyParser::new()),
        Box::new(PythonParser::new()),
        Box::new(GoParser::new()),
    ]
}
