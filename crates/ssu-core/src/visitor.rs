//! AST visitor for traversing PHP syntax trees
//!
//! Default implementations walk every statement, class-like member and
//! expression that can contain a call site. Implementors override the
//! `visit_*` hooks and use the paired `leave_*` hooks to maintain context
//! (enclosing statement, class, method).

use mago_syntax::ast::*;

/// Trait for visiting PHP AST nodes
pub trait Visitor<'a> {
    /// Called for each expression. Return `true` to continue traversal into children.
    fn visit_expression(&mut self, _expr: &Expression<'a>, _source: &str) -> bool {
        true
    }

    /// Called for each statement. Return `true` to continue traversal into children.
    fn visit_statement(&mut self, _stmt: &Statement<'a>, _source: &str) -> bool {
        true
    }

    /// Called after a statement and all its children were traversed
    fn leave_statement(&mut self, _stmt: &Statement<'a>, _source: &str) {}

    /// Called after an expression and all its children were traversed
    fn leave_expression(&mut self, _expr: &Expression<'a>, _source: &str) {}

    /// Called for each method of a class, interface, trait or enum.
    /// Return `true` to traverse the method body.
    fn visit_method(&mut self, _method: &Method<'a>, _source: &str) -> bool {
        true
    }

    fn leave_method(&mut self, _method: &Method<'a>, _source: &str) {}

    /// Called for `new class ... {}` after its constructor arguments were
    /// traversed. Return `true` to traverse the class members.
    fn visit_anonymous_class(&mut self, _class: &AnonymousClass<'a>, _source: &str) -> bool {
        true
    }

    fn leave_anonymous_class(&mut self, _class: &AnonymousClass<'a>, _source: &str) {}

    /// Visit a program (entry point)
    fn visit_program(&mut self, program: &Program<'a>, source: &str) {
        for stmt in program.statements.iter() {
            self.traverse_statement(stmt, source);
        }
    }

    /// Traverse a statement and its children
    fn traverse_statement(&mut self, stmt: &Statement<'a>, source: &str) {
        if !self.visit_statement(stmt, source) {
            return;
        }

        match stmt {
            Statement::Expression(expr_stmt) => {
                self.traverse_expression(&expr_stmt.expression, source);
            }
            Statement::Block(block) => {
                self.traverse_block(block, source);
            }
            Statement::If(if_stmt) => {
                self.traverse_expression(&if_stmt.condition, source);
                self.traverse_if_body(&if_stmt.body, source);
            }
            Statement::Foreach(foreach) => {
                self.traverse_expression(&foreach.expression, source);
                self.traverse_foreach_body(&foreach.body, source);
            }
            Statement::For(for_stmt) => {
                for expr in for_stmt.initializations.iter() {
                    self.traverse_expression(expr, source);
                }
                for expr in for_stmt.conditions.iter() {
                    self.traverse_expression(expr, source);
                }
                for expr in for_stmt.increments.iter() {
                    self.traverse_expression(expr, source);
                }
                self.traverse_for_body(&for_stmt.body, source);
            }
            Statement::While(while_stmt) => {
                self.traverse_expression(&while_stmt.condition, source);
                self.traverse_while_body(&while_stmt.body, source);
            }
            Statement::DoWhile(do_while) => {
                self.traverse_statement(&do_while.statement, source);
                self.traverse_expression(&do_while.condition, source);
            }
            Statement::Class(class) => {
                for member in class.members.iter() {
                    self.traverse_class_like_member(member, source);
                }
            }
            Statement::Interface(iface) => {
                for member in iface.members.iter() {
                    self.traverse_class_like_member(member, source);
                }
            }
            Statement::Trait(tr) => {
                for member in tr.members.iter() {
                    self.traverse_class_like_member(member, source);
                }
            }
            Statement::Enum(en) => {
                for member in en.members.iter() {
                    self.traverse_class_like_member(member, source);
                }
            }
            Statement::Function(func) => {
                self.traverse_block(&func.body, source);
            }
            Statement::Namespace(ns) => {
                let statements = match &ns.body {
                    NamespaceBody::Implicit(body) => &body.statements,
                    NamespaceBody::BraceDelimited(body) => &body.statements,
                };
                for inner in statements.iter() {
                    self.traverse_statement(inner, source);
                }
            }
            Statement::Try(try_stmt) => {
                self.traverse_block(&try_stmt.block, source);
                for catch in try_stmt.catch_clauses.iter() {
                    self.traverse_block(&catch.block, source);
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    self.traverse_block(&finally.block, source);
                }
            }
            Statement::Switch(switch) => {
                self.traverse_expression(&switch.expression, source);
                self.traverse_switch_body(&switch.body, source);
            }
            Statement::Return(ret) => {
                if let Some(expr) = &ret.value {
                    self.traverse_expression(expr, source);
                }
            }
            Statement::Echo(echo) => {
                for expr in echo.values.iter() {
                    self.traverse_expression(expr, source);
                }
            }
            // `<?= ... ?>` lives in template markup, where a docblock would be printed
            Statement::EchoTag(_) => {}
            Statement::Static(static_stmt) => {
                for item in static_stmt.items.iter() {
                    if let StaticItem::Concrete(item) = item {
                        self.traverse_expression(&item.value, source);
                    }
                }
            }
            Statement::Unset(unset) => {
                for expr in unset.values.iter() {
                    self.traverse_expression(expr, source);
                }
            }
            Statement::Declare(declare) => match &declare.body {
                DeclareBody::Statement(inner) => self.traverse_statement(inner, source),
                DeclareBody::ColonDelimited(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, source);
                    }
                }
            },
            _ => {}
        }

        self.leave_statement(stmt, source);
    }

    fn traverse_block(&mut self, block: &Block<'a>, source: &str) {
        for inner in block.statements.iter() {
            self.traverse_statement(inner, source);
        }
    }

    /// Traverse an if body
    fn traverse_if_body(&mut self, body: &IfBody<'a>, source: &str) {
        match body {
            IfBody::Statement(stmt_body) => {
                self.traverse_statement(stmt_body.statement, source);
                for else_if in stmt_body.else_if_clauses.iter() {
                    self.traverse_expression(&else_if.condition, source);
                    self.traverse_statement(else_if.statement, source);
                }
                if let Some(else_clause) = &stmt_body.else_clause {
                    self.traverse_statement(else_clause.statement, source);
                }
            }
            IfBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, source);
                }
                for else_if in block.else_if_clauses.iter() {
                    self.traverse_expression(&else_if.condition, source);
                    for inner in else_if.statements.iter() {
                        self.traverse_statement(inner, source);
                    }
                }
                if let Some(else_clause) = &block.else_clause {
                    for inner in else_clause.statements.iter() {
                        self.traverse_statement(inner, source);
                    }
                }
            }
        }
    }

    /// Traverse a foreach body
    fn traverse_foreach_body(&mut self, body: &ForeachBody<'a>, source: &str) {
        match body {
            ForeachBody::Statement(stmt) => {
                self.traverse_statement(stmt, source);
            }
            ForeachBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, source);
                }
            }
        }
    }

    /// Traverse a for body
    fn traverse_for_body(&mut self, body: &ForBody<'a>, source: &str) {
        match body {
            ForBody::Statement(stmt) => {
                self.traverse_statement(stmt, source);
            }
            ForBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, source);
                }
            }
        }
    }

    /// Traverse a while body
    fn traverse_while_body(&mut self, body: &WhileBody<'a>, source: &str) {
        match body {
            WhileBody::Statement(stmt) => {
                self.traverse_statement(stmt, source);
            }
            WhileBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, source);
                }
            }
        }
    }

    /// Traverse a switch body
    fn traverse_switch_body(&mut self, body: &SwitchBody<'a>, source: &str) {
        match body {
            SwitchBody::BraceDelimited(block) => {
                for case in block.cases.iter() {
                    for stmt in case.statements().iter() {
                        self.traverse_statement(stmt, source);
                    }
                }
            }
            SwitchBody::ColonDelimited(block) => {
                for case in block.cases.iter() {
                    for stmt in case.statements().iter() {
                        self.traverse_statement(stmt, source);
                    }
                }
            }
        }
    }

    /// Traverse a class-like member
    fn traverse_class_like_member(&mut self, member: &ClassLikeMember<'a>, source: &str) {
        if let ClassLikeMember::Method(method) = member {
            if self.visit_method(method, source) {
                if let MethodBody::Concrete(body) = &method.body {
                    self.traverse_block(body, source);
                }
            }
            self.leave_method(method, source);
        }
    }

    fn traverse_arguments(&mut self, arguments: &ArgumentList<'a>, source: &str) {
        for arg in arguments.arguments.iter() {
            self.traverse_expression(arg.value(), source);
        }
    }

    /// Traverse the operands of `isset`, `print`, `include`, `exit` and friends
    fn traverse_construct(&mut self, construct: &Construct<'a>, source: &str) {
        match construct {
            Construct::Isset(isset) => {
                for expr in isset.values.iter() {
                    self.traverse_expression(expr, source);
                }
            }
            Construct::Empty(c) => self.traverse_expression(&c.value, source),
            Construct::Eval(c) => self.traverse_expression(&c.value, source),
            Construct::Include(c) => self.traverse_expression(&c.value, source),
            Construct::IncludeOnce(c) => self.traverse_expression(&c.value, source),
            Construct::Require(c) => self.traverse_expression(&c.value, source),
            Construct::RequireOnce(c) => self.traverse_expression(&c.value, source),
            Construct::Print(c) => self.traverse_expression(&c.value, source),
            Construct::Exit(c) => {
                if let Some(arguments) = &c.arguments {
                    self.traverse_arguments(arguments, source);
                }
            }
            Construct::Die(c) => {
                if let Some(arguments) = &c.arguments {
                    self.traverse_arguments(arguments, source);
                }
            }
        }
    }

    /// Traverse an expression and its children
    fn traverse_expression(&mut self, expr: &Expression<'a>, source: &str) {
        if !self.visit_expression(expr, source) {
            return;
        }

        match expr {
            Expression::Call(Call::Function(func_call)) => {
                self.traverse_arguments(&func_call.argument_list, source);
            }
            Expression::Call(Call::Method(method_call)) => {
                self.traverse_expression(&method_call.object, source);
                self.traverse_arguments(&method_call.argument_list, source);
            }
            Expression::Call(Call::NullSafeMethod(method_call)) => {
                self.traverse_expression(&method_call.object, source);
                self.traverse_arguments(&method_call.argument_list, source);
            }
            Expression::Call(Call::StaticMethod(static_call)) => {
                self.traverse_expression(&static_call.class, source);
                self.traverse_arguments(&static_call.argument_list, source);
            }
            Expression::Instantiation(inst) => {
                self.traverse_expression(&inst.class, source);
                if let Some(arguments) = &inst.argument_list {
                    self.traverse_arguments(arguments, source);
                }
            }
            Expression::AnonymousClass(class) => {
                if let Some(arguments) = &class.argument_list {
                    self.traverse_arguments(arguments, source);
                }
                if self.visit_anonymous_class(class, source) {
                    for member in class.members.iter() {
                        self.traverse_class_like_member(member, source);
                    }
                }
                self.leave_anonymous_class(class, source);
            }
            Expression::Throw(throw) => {
                self.traverse_expression(&throw.exception, source);
            }
            Expression::Yield(yield_expr) => match yield_expr {
                Yield::Value(value) => {
                    if let Some(value) = &value.value {
                        self.traverse_expression(value, source);
                    }
                }
                Yield::Pair(pair) => {
                    self.traverse_expression(&pair.key, source);
                    self.traverse_expression(&pair.value, source);
                }
                Yield::From(from) => {
                    self.traverse_expression(&from.iterator, source);
                }
            },
            Expression::Match(match_expr) => {
                self.traverse_expression(&match_expr.expression, source);
                for arm in match_expr.arms.iter() {
                    match arm {
                        MatchArm::Expression(arm) => {
                            for condition in arm.conditions.iter() {
                                self.traverse_expression(condition, source);
                            }
                            self.traverse_expression(&arm.expression, source);
                        }
                        MatchArm::Default(arm) => {
                            self.traverse_expression(&arm.expression, source);
                        }
                    }
                }
            }
            Expression::CompositeString(string) => {
                for part in string.parts().iter() {
                    match part {
                        StringPart::Expression(inner) => self.traverse_expression(inner, source),
                        StringPart::BracedExpression(braced) => {
                            self.traverse_expression(&braced.expression, source);
                        }
                        StringPart::Literal(_) => {}
                    }
                }
            }
            Expression::Construct(construct) => self.traverse_construct(construct, source),
            Expression::Access(Access::Property(prop)) => {
                self.traverse_expression(&prop.object, source);
            }
            Expression::Access(Access::NullSafeProperty(prop)) => {
                self.traverse_expression(&prop.object, source);
            }
            Expression::Closure(closure) => {
                self.traverse_block(&closure.body, source);
            }
            Expression::ArrowFunction(arrow) => {
                self.traverse_expression(&arrow.expression, source);
            }
            Expression::Clone(clone) => {
                self.traverse_expression(&clone.object, source);
            }
            Expression::UnaryPrefix(unary) => {
                self.traverse_expression(&unary.operand, source);
            }
            Expression::UnaryPostfix(unary) => {
                self.traverse_expression(&unary.operand, source);
            }
            Expression::Parenthesized(paren) => {
                self.traverse_expression(&paren.expression, source);
            }
            Expression::Binary(binary) => {
                self.traverse_expression(&binary.lhs, source);
                self.traverse_expression(&binary.rhs, source);
            }
            Expression::Conditional(ternary) => {
                self.traverse_expression(&ternary.condition, source);
                if let Some(if_expr) = &ternary.then {
                    self.traverse_expression(if_expr, source);
                }
                self.traverse_expression(&ternary.r#else, source);
            }
            Expression::Assignment(assign) => {
                self.traverse_expression(&assign.lhs, source);
                self.traverse_expression(&assign.rhs, source);
            }
            Expression::ArrayAccess(access) => {
                self.traverse_expression(&access.array, source);
                self.traverse_expression(&access.index, source);
            }
            Expression::Array(arr) => {
                for elem in arr.elements.iter() {
                    match elem {
                        ArrayElement::KeyValue(kv) => {
                            self.traverse_expression(&kv.key, source);
                            self.traverse_expression(&kv.value, source);
                        }
                        ArrayElement::Value(val) => {
                            self.traverse_expression(&val.value, source);
                        }
                        ArrayElement::Variadic(var) => {
                            self.traverse_expression(&var.value, source);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        self.leave_expression(expr, source);
    }
}

/// Helper function to run a visitor on a program
pub fn visit<'a, V: Visitor<'a>>(visitor: &mut V, program: &Program<'a>, source: &str) {
    visitor.visit_program(program, source);
}
