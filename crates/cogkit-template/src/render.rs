//! The tree-walking evaluator.
//!
//! A [`Renderer`] owns a private copy of the render context, so `set` and
//! loop variables never leak back to the caller. It checks the shared
//! [`Deadline`] before every node, loop iteration, and filter call, and
//! enforces the output cap on every write.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use cogkit_core::error::RenderError;

use crate::ast::{BinaryOp, CompareOp, Expr, Node};
use crate::context::{Context, ContextValue};
use crate::filters::{FilterRegistry, FilterState};
use crate::random;
use crate::sandbox::{self, Footprint, Limits};
use crate::timeout::Deadline;

pub(crate) struct Renderer<'a> {
    context: Context,
    filters: &'a FilterRegistry,
    deadline: &'a Deadline,
    limits: Limits,
    seed: u64,
    output: String,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        context: &Context,
        filters: &'a FilterRegistry,
        deadline: &'a Deadline,
        limits: Limits,
    ) -> Self {
        let mut context = context.clone();
        context.push();
        Self {
            seed: random::resolve_seed(context.random_seed()),
            context,
            filters,
            deadline,
            limits,
            output: String::new(),
        }
    }

    pub(crate) fn render(mut self, nodes: &[Node]) -> Result<String, RenderError> {
        self.render_nodes(nodes)?;
        Ok(self.output)
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        for node in nodes {
            self.deadline.check()?;
            self.render_node(node)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node) -> Result<(), RenderError> {
        match node {
            Node::Text(text) => self.emit(text),
            Node::Output(expr) => {
                let value = self.eval(expr)?;
                self.emit(&value.to_display_string())
            }
            Node::If { branches, otherwise } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.is_truthy() {
                        return self.render_nodes(body);
                    }
                }
                self.render_nodes(otherwise)
            }
            Node::For {
                target,
                iterable,
                body,
                otherwise,
            } => self.render_for(target, iterable, body, otherwise),
            Node::Set { name, value } => {
                let value = self.eval(value)?;
                self.context.set(name.clone(), value);
                Ok(())
            }
        }
    }

    fn render_for(
        &mut self,
        target: &str,
        iterable: &Expr,
        body: &[Node],
        otherwise: &[Node],
    ) -> Result<(), RenderError> {
        let items = match self.eval(iterable)? {
            ContextValue::List(items) => items,
            ContextValue::String(s) => {
                s.chars().map(|c| ContextValue::String(c.to_string())).collect()
            }
            ContextValue::Dict(map) => map.into_keys().map(ContextValue::String).collect(),
            ContextValue::Undefined | ContextValue::None => Vec::new(),
            other => {
                return Err(RenderError::evaluation(format!(
                    "cannot loop over a value of type {}",
                    other.type_name()
                )))
            }
        };
        if items.is_empty() {
            return self.render_nodes(otherwise);
        }

        let length = items.len();
        for (index0, item) in items.into_iter().enumerate() {
            self.deadline.check()?;
            self.context.push();
            self.context.set(target, item);
            self.context.set("loop", loop_info(index0, length));
            let result = self.render_nodes(body);
            self.context.pop();
            result?;
        }
        Ok(())
    }

    fn emit(&mut self, text: &str) -> Result<(), RenderError> {
        let len = self.output.len() + text.len();
        if len > self.limits.max_output_len {
            return Err(RenderError::evaluation(format!(
                "rendered output exceeds the limit of {} bytes",
                self.limits.max_output_len
            )));
        }
        self.output.push_str(text);
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<ContextValue, RenderError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => self.eval_list(items),
            Expr::Name(name) => {
                Ok(self.context.get(name).cloned().unwrap_or(ContextValue::Undefined))
            }
            Expr::Attr(value, name) => Ok(sandbox::get_attr(&self.eval(value)?, name)),
            Expr::Item(value, key) => Ok(sandbox::get_item(&self.eval(value)?, &self.eval(key)?)),
            Expr::Neg(operand) => negate(self.eval(operand)?),
            Expr::Pos(operand) => match self.eval(operand)? {
                v @ (ContextValue::Integer(_)
                | ContextValue::Float(_)
                | ContextValue::Undefined) => Ok(v),
                other => Err(RenderError::evaluation(format!(
                    "bad operand type for unary +: {}",
                    other.type_name()
                ))),
            },
            Expr::Binary(op, left, right) => binary(
                *op,
                &self.eval(left)?,
                &self.eval(right)?,
                &self.limits,
            ),
            Expr::Compare(op, left, right) => {
                let (left, right) = (self.eval(left)?, self.eval(right)?);
                Ok(ContextValue::Bool(compare(*op, &left, &right)))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Not(operand) => Ok(ContextValue::Bool(!self.eval(operand)?.is_truthy())),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    otherwise
                        .as_ref()
                        .map_or(Ok(ContextValue::Undefined), |e| self.eval(e))
                }
            }
            Expr::Filter { value, name, args } => {
                self.deadline.check()?;
                let value = self.eval(value)?;
                let args = self.eval_all(args)?;
                let state = FilterState::new(self.seed, self.deadline, &self.limits);
                self.filters.apply(name, &value, &args, &state)
            }
            Expr::Call { callee, args } => match &**callee {
                Expr::Name(name) if sandbox::is_global(name) => {
                    let args = self.eval_all(args)?;
                    let value = sandbox::call_global(name, &args, &self.limits)?;
                    Ok(value.unwrap_or(ContextValue::Undefined))
                }
                // Values are data, never callables.
                _ => Ok(ContextValue::Undefined),
            },
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<ContextValue>, RenderError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    /// Builds a list literal, keeping its total footprint within the caps.
    fn eval_list(&self, exprs: &[Expr]) -> Result<ContextValue, RenderError> {
        let mut items = Vec::with_capacity(exprs.len());
        let mut footprint = Footprint::default();
        for expr in exprs {
            self.deadline.check()?;
            let item = self.eval(expr)?;
            let measured = Footprint::measure(std::slice::from_ref(&item), &self.limits)?;
            footprint = footprint.plus(measured);
            self.limits.check_footprint(footprint)?;
            items.push(item);
        }
        Ok(ContextValue::List(items))
    }
}

/// The `loop` variable exposed inside `for` bodies.
fn loop_info(index0: usize, length: usize) -> ContextValue {
    let mut info = BTreeMap::new();
    info.insert("index".to_string(), ContextValue::from(index0 + 1));
    info.insert("index0".to_string(), ContextValue::from(index0));
    info.insert("revindex".to_string(), ContextValue::from(length - index0));
    info.insert("revindex0".to_string(), ContextValue::from(length - index0 - 1));
    info.insert("first".to_string(), ContextValue::Bool(index0 == 0));
    info.insert("last".to_string(), ContextValue::Bool(index0 + 1 == length));
    info.insert("length".to_string(), ContextValue::from(length));
    ContextValue::Dict(info)
}

fn negate(value: ContextValue) -> Result<ContextValue, RenderError> {
    match value {
        ContextValue::Integer(i) => i
            .checked_neg()
            .map(ContextValue::Integer)
            .ok_or_else(overflow),
        ContextValue::Float(f) => Ok(ContextValue::Float(-f)),
        ContextValue::Undefined => Ok(ContextValue::Undefined),
        other => Err(RenderError::evaluation(format!(
            "bad operand type for unary -: {}",
            other.type_name()
        ))),
    }
}

fn overflow() -> RenderError {
    RenderError::evaluation("integer overflow")
}

fn division_by_zero() -> RenderError {
    RenderError::evaluation("division by zero")
}

fn unsupported(op: BinaryOp, left: &ContextValue, right: &ContextValue) -> RenderError {
    RenderError::evaluation(format!(
        "unsupported operand types for {}: {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

/// A pair of numeric operands.
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &ContextValue, right: &ContextValue) -> Option<Numbers> {
    match (left, right) {
        (ContextValue::Integer(a), ContextValue::Integer(b)) => Some(Numbers::Ints(*a, *b)),
        _ => Some(Numbers::Floats(left.as_number()?, right.as_number()?)),
    }
}

pub(crate) fn binary(
    op: BinaryOp,
    left: &ContextValue,
    right: &ContextValue,
    limits: &Limits,
) -> Result<ContextValue, RenderError> {
    if op == BinaryOp::Concat {
        let joined = left.to_display_string() + &right.to_display_string();
        limits.check_string_len(joined.len())?;
        return Ok(ContextValue::String(joined));
    }
    if left.is_undefined() || right.is_undefined() {
        return Ok(ContextValue::Undefined);
    }

    match (op, left, right) {
        (BinaryOp::Add, ContextValue::String(a), ContextValue::String(b)) => {
            limits.check_string_len(a.len() + b.len())?;
            return Ok(ContextValue::String(format!("{a}{b}")));
        }
        (BinaryOp::Add, ContextValue::List(a), ContextValue::List(b)) => {
            let footprint = Footprint::measure(a, limits)?.plus(Footprint::measure(b, limits)?);
            limits.check_footprint(footprint)?;
            return Ok(ContextValue::List(a.iter().chain(b).cloned().collect()));
        }
        (BinaryOp::Mul, ContextValue::String(s), ContextValue::Integer(n))
        | (BinaryOp::Mul, ContextValue::Integer(n), ContextValue::String(s)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            limits.check_sequence_len(s.chars().count().saturating_mul(times))?;
            limits.check_string_len(s.len().saturating_mul(times))?;
            return Ok(ContextValue::String(s.repeat(times)));
        }
        (BinaryOp::Mul, ContextValue::List(items), ContextValue::Integer(n))
        | (BinaryOp::Mul, ContextValue::Integer(n), ContextValue::List(items)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            limits.check_footprint(Footprint::measure(items, limits)?.times(times))?;
            let repeated = (0..times).flat_map(|_| items.iter().cloned()).collect();
            return Ok(ContextValue::List(repeated));
        }
        _ => {}
    }

    let Some(nums) = numbers(left, right) else {
        return Err(unsupported(op, left, right));
    };
    match nums {
        Numbers::Ints(a, b) => int_arithmetic(op, a, b),
        Numbers::Floats(a, b) => float_arithmetic(op, a, b),
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<ContextValue, RenderError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(division_by_zero());
            }
            return Ok(ContextValue::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(division_by_zero());
            }
            a.checked_rem(b).map(|r| if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        BinaryOp::Concat => unreachable!("concatenation is handled before arithmetic"),
    };
    result.map(ContextValue::Integer).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<ContextValue, RenderError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(division_by_zero())
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Concat => unreachable!("concatenation is handled before arithmetic"),
    };
    Ok(ContextValue::Float(result))
}

fn ordering(left: &ContextValue, right: &ContextValue) -> Option<Ordering> {
    match (left, right) {
        (ContextValue::Integer(a), ContextValue::Integer(b)) => Some(a.cmp(b)),
        (ContextValue::String(a), ContextValue::String(b)) => Some(a.cmp(b)),
        _ => left.as_number()?.partial_cmp(&right.as_number()?),
    }
}

/// Evaluates a comparison. Ordering between incomparable values is false.
pub(crate) fn compare(op: CompareOp, left: &ContextValue, right: &ContextValue) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering(left, right), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => !contains(right, left),
    }
}

fn contains(haystack: &ContextValue, needle: &ContextValue) -> bool {
    match (haystack, needle) {
        (ContextValue::String(s), ContextValue::String(sub)) => s.contains(sub.as_str()),
        (ContextValue::List(items), _) => items.contains(needle),
        (ContextValue::Dict(map), ContextValue::String(key)) => map.contains_key(key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn render_with(source: &str, context: &Context, limits: Limits) -> Result<String, RenderError> {
        let filters = FilterRegistry::with_builtins();
        let nodes = parse(source, &tokenize(source)?, &filters)?;
        let deadline = Deadline::unbounded();
        Renderer::new(context, &filters, &deadline, limits).render(&nodes)
    }

    fn render(source: &str, context: &Context) -> String {
        render_with(source, context, Limits::default()).unwrap()
    }

    fn eval_error(source: &str) -> String {
        match render_with(source, &Context::new(), Limits::default()) {
            Err(RenderError::Evaluation { message }) => message,
            other => panic!("expected evaluation error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_text_and_output() {
        let ctx = Context::new().with("name", "World");
        assert_eq!(render("Hello, {{ name }}!", &ctx), "Hello, World!");
        assert_eq!(render("Hello, {{ name }}!", &Context::new()), "Hello, !");
    }

    #[test]
    fn test_if_elif_else() {
        let source = "{% if n > 2 %}big{% elif n > 1 %}mid{% else %}small{% endif %}";
        assert_eq!(render(source, &Context::new().with("n", 3)), "big");
        assert_eq!(render(source, &Context::new().with("n", 2)), "mid");
        assert_eq!(render(source, &Context::new().with("n", 1)), "small");
        assert_eq!(render(source, &Context::new()), "small");
    }

    #[test]
    fn test_for_loop_variables() {
        let ctx = Context::new().with("items", vec!["a", "b", "c"]);
        let source = concat!(
            "{% for x in items %}{{ loop.index }}{{ x }}",
            "{% if not loop.last %},{% endif %}{% endfor %}",
        );
        let out = render(source, &ctx);
        assert_eq!(out, "1a,2b,3c");
        let out = render(
            "{% for x in items %}{{ loop.index0 }}/{{ loop.length }}{{ loop.first }} {% endfor %}",
            &ctx,
        );
        assert_eq!(out, "0/3True 1/3False 2/3False ");
    }

    #[test]
    fn test_for_else_on_empty_and_undefined() {
        let ctx = Context::new().with("items", Vec::<i64>::new());
        assert_eq!(render("{% for x in items %}x{% else %}none{% endfor %}", &ctx), "none");
        assert_eq!(render("{% for x in missing %}x{% else %}none{% endfor %}", &ctx), "none");
    }

    #[test]
    fn test_for_over_string_and_mapping() {
        assert_eq!(render("{% for c in 'abc' %}{{ c }}.{% endfor %}", &Context::new()), "a.b.c.");
        let ctx = Context::from_json(serde_json::json!({"m": {"b": 1, "a": 2}})).unwrap();
        assert_eq!(render("{% for k in m %}{{ k }}={{ m[k] }} {% endfor %}", &ctx), "a=2 b=1 ");
    }

    #[test]
    fn test_for_over_number_fails() {
        assert!(eval_error("{% for x in 5 %}{% endfor %}").contains("cannot loop"));
    }

    #[test]
    fn test_loop_variable_does_not_leak() {
        let ctx = Context::new().with("x", "outer");
        assert_eq!(render("{% for x in [1, 2] %}{{ x }}{% endfor %}{{ x }}", &ctx), "12outer");
    }

    #[test]
    fn test_set_is_render_local() {
        let ctx = Context::new().with("name", "bob");
        assert_eq!(render("{% set name = name | upper %}{{ name }}", &ctx), "BOB");
        assert_eq!(ctx.get("name").unwrap().to_display_string(), "bob");
    }

    #[test]
    fn test_arithmetic() {
        let ctx = Context::new();
        assert_eq!(render("{{ 1 + 2 * 3 }}", &ctx), "7");
        assert_eq!(render("{{ 7 / 2 }}", &ctx), "3.5");
        assert_eq!(render("{{ 7 // 2 }} {{ -7 // 2 }}", &ctx), "3 -4");
        assert_eq!(render("{{ 7 % 3 }} {{ -7 % 3 }}", &ctx), "1 2");
        assert_eq!(render("{{ 1.5 + 1 }}", &ctx), "2.5");
        assert_eq!(render("{{ 'ab' * 3 }}", &ctx), "ababab");
        assert_eq!(render("{{ 'a' + 'b' }}{{ [1] + [2] }}", &ctx), "ab[1, 2]");
        assert_eq!(render("{{ 'n' ~ 1 ~ missing }}", &ctx), "n1");
        assert_eq!(render("{{ -(2) }} {{ +3 }}", &ctx), "-2 3");
    }

    #[test]
    fn test_arithmetic_with_undefined_is_undefined() {
        assert_eq!(render("[{{ missing + 1 }}][{{ -missing }}]", &Context::new()), "[][]");
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(eval_error("{{ 1 / 0 }}"), "division by zero");
        assert_eq!(eval_error("{{ 1 // 0 }}"), "division by zero");
        assert_eq!(eval_error("{{ 1 % 0 }}"), "division by zero");
        assert_eq!(eval_error("{{ 1.0 / 0 }}"), "division by zero");
        assert_eq!(eval_error("{{ 9223372036854775807 + 1 }}"), "integer overflow");
        assert!(eval_error("{{ 'a' - 1 }}").contains("unsupported operand types for -"));
    }

    #[test]
    fn test_comparisons() {
        let ctx = Context::new();
        assert_eq!(
            render("{{ 1 < 2 }} {{ 2 <= 2 }} {{ 'b' > 'a' }} {{ 1 == 1.0 }}", &ctx),
            "True True True True"
        );
        assert_eq!(render("{{ 'a' < 1 }} {{ missing < 1 }}", &ctx), "False False");
        assert_eq!(
            render("{{ 'ell' in 'hello' }} {{ 2 in [1, 2] }} {{ 3 not in [1] }}", &ctx),
            "True True True"
        );
    }

    #[test]
    fn test_boolean_operators_return_operands() {
        let ctx = Context::new().with("name", "");
        assert_eq!(render("{{ name or 'anon' }}", &ctx), "anon");
        assert_eq!(render("{{ 'x' and 'y' }}", &ctx), "y");
        assert_eq!(render("{{ not name }}", &ctx), "True");
    }

    #[test]
    fn test_inline_conditional() {
        let ctx = Context::new().with("n", 2);
        assert_eq!(render("{{ 'many' if n > 1 else 'one' }}", &ctx), "many");
        assert_eq!(render("[{{ 'x' if n > 5 }}]", &ctx), "[]");
    }

    #[test]
    fn test_none_renders_empty() {
        let ctx = Context::new().with("nothing", ContextValue::None);
        assert_eq!(render("[{{ nothing }}][{{ none }}]", &ctx), "[][]");
    }

    #[test]
    fn test_sandbox_lookups() {
        let ctx = Context::from_json(serde_json::json!({
            "user": {"name": "John", "_token": "secret"},
            "items": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(render("{{ user.name }}{{ user._token }}{{ user['_token'] }}", &ctx), "John");
        assert_eq!(render("{{ items[-1] }}{{ items.0 }}{{ items[10] }}", &ctx), "31");
        assert_eq!(render("[{{ user.name.upper() }}][{{ user.name.__class__ }}]", &ctx), "[][]");
    }

    #[test]
    fn test_range_global() {
        assert_eq!(render("{% for i in range(3) %}{{ i }}{% endfor %}", &Context::new()), "012");
        assert!(eval_error("{{ range(1, 2, 0) }}").contains("step"));
    }

    #[test]
    fn test_repetition_is_capped() {
        assert!(eval_error("{{ 'ab' * 100000 }}").contains("exceeds the limit"));
        assert!(eval_error("{{ [1, 2] * 60000 }}").contains("exceeds the limit"));
    }

    #[test]
    fn test_most_negative_integer() {
        assert_eq!(render("{{ -9223372036854775807 - 1 }}", &Context::new()), i64::MIN.to_string());
        assert!(eval_error("{{ -(-9223372036854775807 - 1) }}").contains("overflow"));
    }

    #[test]
    fn test_nested_lists_count_in_full() {
        let err = eval_error("{{ ([range(100000)] * 100) | length }}");
        assert!(err.contains("exceeds the limit"), "{err}");
        let err = eval_error("{{ ([range(60000)] + [range(60000)]) | length }}");
        assert!(err.contains("exceeds the limit"), "{err}");
        let err = eval_error("{{ [range(60000), range(60000)] | length }}");
        assert!(err.contains("exceeds the limit"), "{err}");
        assert_eq!(render("{{ ([range(10)] * 3) | length }}", &Context::new()), "3");
        assert_eq!(render("{{ ([[1, 2]] + [[3]]) | length }}", &Context::new()), "2");
    }

    #[test]
    fn test_list_text_is_capped() {
        let limits = Limits {
            max_output_len: 10,
            max_range: 100,
        };
        let err = render_with("{{ (['abcdef'] * 2) | length }}", &Context::new(), limits);
        assert!(err.unwrap_err().to_string().contains("bytes of text"));
    }

    #[test]
    fn test_set_cannot_nest_lists_without_bound() {
        let source = "{% set x = 0 %}".to_string() + &"{% set x = [x] %}".repeat(200);
        let err = eval_error(&source);
        assert!(err.contains("nests deeper"), "{err}");
        let shallow = "{% set x = 0 %}".to_string() + &"{% set x = [x] %}".repeat(100);
        assert_eq!(render(&(shallow + "{{ x | length }}"), &Context::new()), "1");
    }

    #[test]
    fn test_output_is_capped() {
        let limits = Limits {
            max_output_len: 10,
            max_range: 100,
        };
        let err = render_with(
            "{% for i in range(20) %}x{% endfor %}",
            &Context::new(),
            limits,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rendered output exceeds"));
        assert_eq!(
            render_with("{% for i in range(10) %}x{% endfor %}", &Context::new(), limits).unwrap(),
            "xxxxxxxxxx"
        );
    }

    #[test]
    fn test_filters_in_expressions() {
        let ctx = Context::new().with("name", "  bob ");
        assert_eq!(render("{{ name | trim | title }}", &ctx), "Bob");
        assert_eq!(render("{{ missing | default('anon') }}", &ctx), "anon");
    }

    #[test]
    fn test_seeded_random_is_stable_within_render() {
        let ctx = Context::new()
            .with("games", vec!["chess", "go", "poker", "bridge", "tetris"])
            .with("random_seed", 99);
        let out = render("{{ games | random }}|{{ games | random }}", &ctx);
        let (a, b) = out.split_once('|').unwrap();
        assert_eq!(a, b);
        assert_eq!(render("{{ games | random }}", &ctx), a);
    }

    #[test]
    fn test_cancelled_deadline_stops_render() {
        let filters = FilterRegistry::with_builtins();
        let source = "{% for i in range(10) %}{{ i }}{% endfor %}";
        let nodes = parse(source, &tokenize(source).unwrap(), &filters).unwrap();
        let deadline = Deadline::unbounded();
        deadline.cancel();
        let renderer = Renderer::new(&Context::new(), &filters, &deadline, Limits::default());
        let result = renderer.render(&nodes);
        assert!(result.unwrap_err().is_timeout());
    }
}
