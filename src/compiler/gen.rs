use crate::common::{lit::Lit, span::Spanned};
use crate::compiler::error::Error;
use crate::construct::{
    ast::{Ast, Params, Program},
    form::Form,
};

/// Emits JavaScript for a lowered program. Output is a pure
/// function of the AST: iteration orders are fixed and map
/// entries are sorted by emitted key, so the same program
/// produces the same bytes in any session.
pub struct Gen {
    depth: usize,
}

impl Gen {
    /// `exports` names the top-level definitions to mark with
    /// `export`; everything else stays module-local.
    pub fn gen(program: &Program, exports: &[String]) -> Result<String, Error> {
        let mut gen = Gen { depth: 0 };
        let mut out = String::new();
        for node in &program.body {
            out.push_str(&gen.top_level(node, exports)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn top_level(
        &mut self,
        node: &Spanned<Ast>,
        exports: &[String],
    ) -> Result<String, Error> {
        match &node.item {
            Ast::Import { bindings, path } => {
                let specifiers = bindings
                    .iter()
                    .map(|(original, alias)| {
                        if original == alias {
                            mangle(original)
                        } else {
                            format!("{} as {}", mangle(original), mangle(alias))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!(
                    "import {{ {} }} from {};",
                    specifiers,
                    string(&path.to_string_lossy()),
                ))
            },
            Ast::Def { name, value } => {
                let keyword = if exports.iter().any(|e| e == name) {
                    "export const"
                } else {
                    "const"
                };
                Ok(format!(
                    "{} {} = {};",
                    keyword,
                    mangle(name),
                    self.expression(value)?,
                ))
            },
            _ => Ok(format!("{};", self.expression(node)?)),
        }
    }

    fn expression(&mut self, node: &Spanned<Ast>) -> Result<String, Error> {
        match &node.item {
            Ast::Lit(lit) => Ok(literal(lit)),
            Ast::Symbol(name) => Ok(mangle(name)),

            Ast::Vector(items) => {
                let items = self.expressions(items)?;
                Ok(format!("[{}]", items.join(", ")))
            },
            Ast::Set(items) => {
                let items = self.expressions(items)?;
                Ok(format!("new Set([{}])", items.join(", ")))
            },
            Ast::Map(pairs) => self.map(pairs),

            Ast::Quoted(form) => Ok(self.quoted(&form.item)),

            Ast::Call { fun, args } => self.call(fun, args),
            Ast::Fn { name, params, body } => self.function(name, params, body),
            Ast::If {
                cond,
                then,
                otherwise,
            } => {
                let otherwise = match otherwise {
                    Some(node) => self.expression(node)?,
                    None => "null".to_string(),
                };
                Ok(format!(
                    "({} ? {} : {})",
                    self.expression(cond)?,
                    self.expression(then)?,
                    otherwise,
                ))
            },
            Ast::Let { bindings, body } => self.iife(bindings, body),
            Ast::Do(body) => {
                if body.is_empty() {
                    return Ok("null".to_string());
                }
                self.iife(&[], body)
            },

            // statement-only nodes
            Ast::Def { .. } | Ast::Import { .. } => Err(Error::codegen(
                node.item.node_type(),
                "only valid at the top level of a module".to_string(),
            )),
        }
    }

    fn expressions(
        &mut self,
        nodes: &[Spanned<Ast>],
    ) -> Result<Vec<String>, Error> {
        nodes.iter().map(|node| self.expression(node)).collect()
    }

    /// Object literal with entries sorted by emitted key, so
    /// source-order differences in map literals never leak
    /// into the output.
    fn map(
        &mut self,
        pairs: &[(Spanned<Ast>, Spanned<Ast>)],
    ) -> Result<String, Error> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let key = match &key.item {
                Ast::Lit(Lit::String(text)) => string(text),
                _ => format!("[{}]", self.expression(key)?),
            };
            entries.push(format!("{}: {}", key, self.expression(value)?));
        }
        entries.sort();
        Ok(format!("{{ {} }}", entries.join(", ")))
    }

    fn call(
        &mut self,
        fun: &Spanned<Ast>,
        args: &[Spanned<Ast>],
    ) -> Result<String, Error> {
        if let Ast::Symbol(head) = &fun.item {
            if let Some(rendered) = self.builtin(head, args)? {
                return Ok(rendered);
            }
        }
        let args = self.expressions(args)?.join(", ");
        Ok(format!("{}({})", self.expression(fun)?, args))
    }

    /// Calls to a fixed set of heads render as JavaScript
    /// operators instead of function calls. Returns `None`
    /// when the head is an ordinary function.
    fn builtin(
        &mut self,
        head: &str,
        args: &[Spanned<Ast>],
    ) -> Result<Option<String>, Error> {
        let arity = |wanted: &str| {
            Error::codegen(
                "Call",
                format!("`{}` takes {}, but {} were given", head, wanted, args.len()),
            )
        };

        let rendered = match head {
            "print" => {
                format!("console.log({})", self.expressions(args)?.join(", "))
            },

            "+" | "*" | "/" | "and" | "or" => {
                if args.len() < 2 {
                    return Err(arity("at least two arguments"));
                }
                let op = match head {
                    "+" => "+",
                    "*" => "*",
                    "/" => "/",
                    "and" => "&&",
                    _ => "||",
                };
                self.fold(op, args)?
            },
            "-" => match args {
                [only] => format!("(-{})", self.expression(only)?),
                [_, _, ..] => self.fold("-", args)?,
                [] => return Err(arity("at least one argument")),
            },

            "%" | "=" | "not=" | "<" | ">" | "<=" | ">=" => {
                let [left, right] = args else {
                    return Err(arity("exactly two arguments"));
                };
                let op = match head {
                    "=" => "===",
                    "not=" => "!==",
                    other => other,
                };
                format!(
                    "({} {} {})",
                    self.expression(left)?,
                    op,
                    self.expression(right)?,
                )
            },

            "not" => {
                let [only] = args else {
                    return Err(arity("exactly one argument"));
                };
                format!("(!{})", self.expression(only)?)
            },

            _ => return Ok(None),
        };

        Ok(Some(rendered))
    }

    fn fold(&mut self, op: &str, args: &[Spanned<Ast>]) -> Result<String, Error> {
        Ok(format!(
            "({})",
            self.expressions(args)?.join(&format!(" {} ", op)),
        ))
    }

    fn function(
        &mut self,
        name: &Option<String>,
        params: &Params,
        body: &[Spanned<Ast>],
    ) -> Result<String, Error> {
        let params = match params {
            Params::Fixed(names) => names
                .iter()
                .map(|name| mangle(name))
                .collect::<Vec<_>>()
                .join(", "),
            Params::Variadic { fixed, rest } => {
                let mut names: Vec<_> =
                    fixed.iter().map(|name| mangle(name)).collect();
                names.push(format!("...{}", mangle(rest)));
                names.join(", ")
            },
        };

        let block = self.block(body)?;
        let close = "  ".repeat(self.depth);
        Ok(match name {
            Some(name) => format!(
                "function {}({}) {{\n{}{}}}",
                mangle(name),
                params,
                block,
                close,
            ),
            None => format!("(({}) => {{\n{}{}}})", params, block, close),
        })
    }

    /// `let` and `do` become immediately-invoked closures,
    /// which keeps their bindings scoped and gives them a
    /// value in expression position.
    fn iife(
        &mut self,
        bindings: &[(String, Spanned<Ast>)],
        body: &[Spanned<Ast>],
    ) -> Result<String, Error> {
        let close = "  ".repeat(self.depth);
        self.depth += 1;
        let pad = "  ".repeat(self.depth);

        let mut out = String::new();
        for (name, value) in bindings {
            out.push_str(&format!(
                "{}const {} = {};\n",
                pad,
                mangle(name),
                self.expression(value)?,
            ));
        }
        self.depth -= 1;

        let block = self.block(body)?;
        Ok(format!("(() => {{\n{}{}{}}})()", out, block, close))
    }

    /// Statements of a function body, with the final one
    /// returned. Inner `def` forms become local `const`s.
    fn block(&mut self, body: &[Spanned<Ast>]) -> Result<String, Error> {
        self.depth += 1;
        let pad = "  ".repeat(self.depth);

        let mut out = String::new();
        for (index, node) in body.iter().enumerate() {
            let last = index + 1 == body.len();
            match &node.item {
                Ast::Def { name, value } => {
                    if last {
                        self.depth -= 1;
                        return Err(Error::codegen(
                            "Def",
                            "a definition cannot be the value of a body"
                                .to_string(),
                        ));
                    }
                    out.push_str(&format!(
                        "{}const {} = {};\n",
                        pad,
                        mangle(name),
                        self.expression(value)?,
                    ));
                },
                _ => {
                    let rendered = self.expression(node)?;
                    if last {
                        out.push_str(&format!("{}return {};\n", pad, rendered));
                    } else {
                        out.push_str(&format!("{}{};\n", pad, rendered));
                    }
                },
            }
        }

        self.depth -= 1;
        Ok(out)
    }

    /// Quoted forms become plain JavaScript data: symbols as
    /// strings, lists and vectors as arrays.
    fn quoted(&mut self, form: &Form) -> String {
        match form {
            Form::Symbol(name) => string(name),
            Form::Lit(lit) => literal(lit),
            Form::List(items) | Form::Vector(items) => {
                let items: Vec<_> =
                    items.iter().map(|item| self.quoted(&item.item)).collect();
                format!("[{}]", items.join(", "))
            },
            Form::Set(items) => {
                let items: Vec<_> =
                    items.iter().map(|item| self.quoted(&item.item)).collect();
                format!("new Set([{}])", items.join(", "))
            },
            Form::Map(pairs) => {
                let mut entries: Vec<_> = pairs
                    .iter()
                    .map(|(key, value)| {
                        let key = match &key.item {
                            Form::Lit(Lit::String(text)) => string(text),
                            other => format!("[{}]", self.quoted(other)),
                        };
                        format!("{}: {}", key, self.quoted(&value.item))
                    })
                    .collect();
                entries.sort();
                format!("{{ {} }}", entries.join(", "))
            },
            // canonicalization rewrote the sigils to lists, but
            // render any stray one the same way for good measure
            Form::Quote(inner) => {
                format!("[{}, {}]", string("quote"), self.quoted(&inner.item))
            },
            Form::Quasiquote(inner) => format!(
                "[{}, {}]",
                string("quasiquote"),
                self.quoted(&inner.item),
            ),
            Form::Unquote(inner) => {
                format!("[{}, {}]", string("unquote"), self.quoted(&inner.item))
            },
        }
    }
}

fn literal(lit: &Lit) -> String {
    match lit {
        Lit::Number(n) => number(*n),
        Lit::String(text) => string(text),
        Lit::Boolean(true) => "true".to_string(),
        Lit::Boolean(false) => "false".to_string(),
        Lit::Nil => "null".to_string(),
    }
}

/// Numbers that hold an integer value print without a
/// fractional part, so `2` stays `2` rather than `2.0`.
fn number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A double-quoted JavaScript string literal.
fn string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            },
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Turns a source-language identifier into a valid JavaScript
/// one. Kebab-case becomes snake_case; the remaining symbol
/// characters get readable suffix spellings.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '-' => out.push('_'),
            '?' => out.push_str("_p"),
            '!' => out.push_str("_bang"),
            '*' => out.push_str("_star"),
            '+' => out.push_str("_plus"),
            '/' => out.push_str("_div"),
            '=' => out.push_str("_eq"),
            '<' => out.push_str("_lt"),
            '>' => out.push_str("_gt"),
            '%' => out.push_str("_mod"),
            '&' => out.push_str("_amp"),
            '.' | '#' => out.push('_'),
            c => out.push(c),
        }
    }
    out
}
