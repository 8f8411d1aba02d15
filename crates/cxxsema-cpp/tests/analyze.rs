mod common;

use common::{analyze, probe, type_of};
use cxxsema_core::ProblemCode;
use cxxsema_cpp::analyze_with;
use cxxsema_resolver::Config;
use pretty_assertions::assert_eq;

#[test]
fn pointers_arrays_and_sizeof() {
    let unit = analyze(
        r#"
        int v;
        int *p = &v;
        int arr[4];

        void f() {
            *p;
            &v;
            *arr;
            (*p);
            sizeof(int);
            sizeof v;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "*p"), "int");
    assert_eq!(type_of(&unit, "&v"), "int *");
    assert_eq!(type_of(&unit, "*arr"), "int");
    assert_eq!(type_of(&unit, "(*p)"), "int");
    assert_eq!(type_of(&unit, "sizeof(int)"), "unsigned long");
    assert_eq!(type_of(&unit, "sizeof v"), "unsigned long");
    assert_eq!(unit.skipped, 0);
}

#[test]
fn global_initializers_are_not_probed() {
    let unit = analyze(
        r#"
        int v;
        int *p = &v;
        "#,
    );
    assert!(unit.probes.is_empty());
}

#[test]
fn probes_record_their_line() {
    let unit = analyze(
        r#"
        int *p;
        void f() {

            *p;
        }
        "#,
    );
    // dedent keeps the leading newline
    assert_eq!(probe(&unit, "*p").line, 5);
}

#[test]
fn member_addresses() {
    let unit = analyze(
        r#"
        struct Obj {
            double field;
            int method();
            static int count;
        };

        void g() {
            &Obj::field;
            &Obj::method;
            &Obj::count;
            &(Obj::field);
            &(Obj::method);
        }
        "#,
    );

    assert_eq!(type_of(&unit, "&Obj::field"), "double Obj::*");
    assert_eq!(type_of(&unit, "&Obj::method"), "int (Obj::*)()");
    assert_eq!(type_of(&unit, "&Obj::count"), "int *");
    assert_eq!(type_of(&unit, "&(Obj::field)"), "double *");

    let ty = unit.resolve(probe(&unit, "&(Obj::method)"));
    let problem = ty.problem_info().unwrap();
    assert_eq!(problem.code, ProblemCode::InvalidType);
    assert_eq!(problem.text, "Obj::method");
}

#[test]
fn long_operand_chains_resolve() {
    let unit = analyze(&format!("int *p;\nvoid g() {{ {}p; }}\n", "!".repeat(100)));
    assert_eq!(unit.skipped, 0);
    assert_eq!(unit.render(&unit.resolve(&unit.probes[0])), "int *");
}

#[test]
fn chains_past_the_depth_limit_are_skipped() {
    let source = format!(
        "int *p;\nvoid g() {{\n    {}p;\n    *p;\n}}\n",
        "!".repeat(20_000)
    );
    let unit = analyze(&source);
    assert_eq!(unit.skipped, 1);
    assert_eq!(unit.probes.len(), 1);
    assert_eq!(type_of(&unit, "*p"), "int");
}

#[test]
fn depth_limit_follows_config() {
    common::init_tracing();
    let config = Config {
        max_depth: 4,
        ..Config::default()
    };
    let unit = analyze_with("int *p;\nvoid g() { !!!p; !!!!p; }\n", &config).unwrap();
    assert_eq!(unit.skipped, 1);
    assert_eq!(type_of(&unit, "!!!p"), "int *");
}

#[test]
fn overloaded_dereference_including_inherited() {
    let unit = analyze(
        r#"
        struct Iter {
            int &operator*();
            Iter &operator++();
        };
        struct Derived : Iter {};
        struct Plain {};

        void h(Iter it, Derived d, Plain x) {
            *it;
            *d;
            ++it;
            *x;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "*it"), "int &");
    assert_eq!(type_of(&unit, "*d"), "int &");
    assert_eq!(type_of(&unit, "++it"), "Iter");

    let ty = unit.resolve(probe(&unit, "*x"));
    let problem = ty.problem_info().unwrap();
    assert_eq!(problem.code, ProblemCode::InvalidType);
    assert_eq!(problem.text, "*x");
}

#[test]
fn free_operator_applies_to_class_argument() {
    let unit = analyze(
        r#"
        struct Handle {};
        double &operator*(const Handle &h);

        void use(Handle h) {
            *h;
        }
        "#,
    );
    assert_eq!(type_of(&unit, "*h"), "double &");
}

#[test]
fn template_operands_are_dependent() {
    let unit = analyze(
        r#"
        template <typename T>
        void tpl(T t) {
            *t;
            &t;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "*t"), "<unknown>");
    assert_eq!(type_of(&unit, "&t"), "T *");
}

#[test]
fn namespaces_typedefs_and_qualifiers() {
    let unit = analyze(
        r#"
        namespace ns {
        typedef int &IntRef;
        struct S { int x; };
        }

        void k(ns::IntRef r, const int cv) {
            -r;
            !cv;
            &cv;
            &ns::S::x;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "-r"), "int");
    assert_eq!(type_of(&unit, "!cv"), "const int");
    assert_eq!(type_of(&unit, "&cv"), "const int *");
    assert_eq!(type_of(&unit, "&ns::S::x"), "int ns::S::*");
}

#[test]
fn literals_and_casts() {
    let unit = analyze(
        r#"
        void lit() {
            *"hi";
            !1.5f;
            ~42u;
            -'a';
            *static_cast<int *>(nullptr);
            *(char *)0;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "*\"hi\""), "const char");
    assert_eq!(type_of(&unit, "!1.5f"), "float");
    assert_eq!(type_of(&unit, "~42u"), "unsigned int");
    assert_eq!(type_of(&unit, "-'a'"), "char");
    assert_eq!(type_of(&unit, "*static_cast<int *>(nullptr)"), "int");
    assert_eq!(type_of(&unit, "*(char *)0"), "char");
}

#[test]
fn auto_declarations_are_deduced() {
    let unit = analyze(
        r#"
        void deduce() {
            int v;
            const int cv = 1;
            auto q = &v;
            auto &ref = cv;
            *q;
            &ref;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "*q"), "int");
    assert_eq!(type_of(&unit, "&ref"), "const int *");
}

#[test]
fn member_functions_see_this_and_later_members() {
    let unit = analyze(
        r#"
        struct W {
            void inline_body() { &later; }
            void touch();
            int later;
        };

        void W::touch() {
            *this;
        }
        "#,
    );

    assert_eq!(type_of(&unit, "&later"), "int *");
    assert_eq!(type_of(&unit, "*this"), "W");
}

#[test]
fn enumerators_are_int_valued() {
    let unit = analyze(
        r#"
        enum Color { Red, Green };
        void e() {
            -Red;
        }
        "#,
    );
    assert_eq!(type_of(&unit, "-Red"), "int");
}

#[test]
fn unknown_names_and_unsupported_operands() {
    let unit = analyze(
        r#"
        int *f();
        void bad() {
            *missing;
            *f();
        }
        "#,
    );

    let ty = unit.resolve(probe(&unit, "*missing"));
    assert_eq!(ty.problem_info().unwrap().code, ProblemCode::NameNotFound);
    assert_eq!(unit.skipped, 1);
    assert!(unit.probes.iter().all(|probe| probe.text != "*f()"));
}
