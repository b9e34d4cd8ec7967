use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::value::format_float;

/// Renders trees in parenthesised prefix form, e.g. `(+ 1 (group 2))`.
/// Used by the `parse` subcommand for debugging.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_expr(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::Nil => "nil".into(),

                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Int(n) => itoa::Buffer::new().format(*n).to_owned(),

                LiteralValue::Float(n) => format_float(*n),

                LiteralValue::Str(s) => s.clone(),
            },

            Expr::Grouping(inner) => Self::parenthesize("group", [inner.as_ref()]),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                Self::parenthesize(&operator.lexeme, [right.as_ref()])
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => Self::parenthesize(&operator.lexeme, [left.as_ref(), right.as_ref()]),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print_expr(value))
            }

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print_expr(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print_expr(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print_expr(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                Self::print_expr(object),
                name.lexeme,
                Self::print_expr(value)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print_expr(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print_expr(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print_expr(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::join("(block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if-else {} {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While {
                condition,
                body,
                increment,
            } => match increment {
                Some(increment) => format!(
                    "(while {} {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(body),
                    Self::print_expr(increment)
                ),
                None => format!(
                    "(while {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(body)
                ),
            },

            Stmt::Break(_) => "(break)".into(),

            Stmt::Continue(_) => "(continue)".into(),

            Stmt::Function(decl) => Self::function(decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print_expr(value)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(" < ");
                    s.push_str(&Self::print_expr(superclass));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::function(method));
                }
                s.push(')');
                s
            }
        }
    }

    fn function(decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();

        Self::join(
            &format!("(fun {}({})", decl.name.lexeme, params.join(" ")),
            &decl.body,
        )
    }

    fn parenthesize<'e>(name: &str, exprs: impl IntoIterator<Item = &'e Expr>) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print_expr(expr));
        }
        s.push(')');
        s
    }

    fn join(head: &str, statements: &[Stmt]) -> String {
        let mut s = head.to_string();
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }
}
