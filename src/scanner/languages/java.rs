use tree_sitter::{Node, Parser};

use crate::cli::Language;
use crate::error::ParserError;
use crate::scanner::element::{CodeElement, ElementKind, Parameter, Visibility};

use super::LanguageScanner;

/// Grammar-aware scanner backed by tree-sitter-java.
pub struct JavaScanner;

impl LanguageScanner for JavaScanner {
    fn language(&self) -> Language {
        Language::Java
    }

    fn scan(&self, source: &str, file_path: &str) -> Result<Vec<CodeElement>, ParserError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|_| ParserError::language_setup_failed("java"))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParserError::parse_failed(file_path))?;
        let root = tree.root_node();

        if let Some(node) = first_error(root) {
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "unexpected syntax".to_string()
            };
            return Err(ParserError::syntax_error(
                position.row + 1,
                position.column + 1,
                message,
            ));
        }

        let ctx = Ctx {
            source: source.as_bytes(),
            file_path,
        };
        Ok(collect(&ctx, root))
    }
}

struct Ctx<'s> {
    source: &'s [u8],
    file_path: &'s str,
}

impl<'s> Ctx<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn element(&self, name: &str, kind: ElementKind, node: Node) -> Option<CodeElement> {
        CodeElement::new(
            name,
            kind,
            Language::Java,
            self.file_path,
            node.start_position().row + 1,
        )
    }
}

#[derive(Clone, Copy)]
struct Scope<'s> {
    owner: Option<&'s str>,
    /// Members of interfaces and annotation types are implicitly public.
    interface_members: bool,
}

#[derive(Default)]
struct Modifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    annotations: Vec<String>,
}

impl Modifiers {
    fn read(ctx: &Ctx, declaration: Node) -> Self {
        let mut modifiers = Self::default();
        let mut cursor = declaration.walk();
        let Some(list) = declaration
            .children(&mut cursor)
            .find(|child| child.kind() == "modifiers")
        else {
            return modifiers;
        };

        let mut cursor = list.walk();
        for token in list.children(&mut cursor) {
            match token.kind() {
                "marker_annotation" | "annotation" => {
                    if let Some(name) = token.child_by_field_name("name") {
                        modifiers.annotations.push(ctx.text(name).to_string());
                    }
                }
                "static" => modifiers.is_static = true,
                "abstract" => modifiers.is_abstract = true,
                keyword => {
                    if let Some(visibility) = Visibility::from_keyword(keyword) {
                        modifiers.visibility = Some(visibility);
                    }
                }
            }
        }
        modifiers
    }

    fn visibility(&self, scope: Scope) -> Visibility {
        self.visibility.unwrap_or(if scope.interface_members {
            Visibility::Public
        } else {
            Visibility::Package
        })
    }
}

/// Pre-order walk with an explicit stack; element order follows the source.
fn collect<'s>(ctx: &Ctx<'s>, root: Node<'s>) -> Vec<CodeElement> {
    let mut elements = Vec::new();
    let mut stack = vec![(
        root,
        Scope {
            owner: None,
            interface_members: false,
        },
    )];

    while let Some((node, scope)) = stack.pop() {
        let mut pending: Vec<(Node<'s>, Scope<'s>)> = Vec::new();

        match node.kind() {
            "class_declaration" | "record_declaration" => {
                type_declaration(ctx, node, ElementKind::Class, scope, &mut elements, &mut pending);
            }
            "interface_declaration" | "annotation_type_declaration" => {
                type_declaration(ctx, node, ElementKind::Interface, scope, &mut elements, &mut pending);
            }
            "enum_declaration" => {
                type_declaration(ctx, node, ElementKind::Enum, scope, &mut elements, &mut pending);
            }
            "method_declaration" | "annotation_type_element_declaration" => {
                elements.extend(method(ctx, node, scope));
                if let Some(body) = node.child_by_field_name("body") {
                    pending.push((
                        body,
                        Scope {
                            interface_members: false,
                            ..scope
                        },
                    ));
                }
            }
            "field_declaration" | "constant_declaration" => {
                elements.extend(fields(ctx, node, scope));
                push_children(node, scope, &mut pending);
            }
            _ => push_children(node, scope, &mut pending),
        }

        stack.extend(pending.into_iter().rev());
    }

    elements
}

fn push_children<'s>(node: Node<'s>, scope: Scope<'s>, pending: &mut Vec<(Node<'s>, Scope<'s>)>) {
    let mut cursor = node.walk();
    pending.extend(node.named_children(&mut cursor).map(|child| (child, scope)));
}

fn type_declaration<'s>(
    ctx: &Ctx<'s>,
    node: Node<'s>,
    kind: ElementKind,
    scope: Scope<'s>,
    elements: &mut Vec<CodeElement>,
    pending: &mut Vec<(Node<'s>, Scope<'s>)>,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = ctx.text(name_node);
    let modifiers = Modifiers::read(ctx, node);

    if let Some(mut element) = ctx.element(name, kind, node) {
        element.visibility = modifiers.visibility(scope);
        element.is_static = modifiers.is_static;
        element.is_abstract = modifiers.is_abstract;
        element.owner = scope.owner.map(str::to_string);

        if let Some(superclass) = node.child_by_field_name("superclass") {
            element.parent = superclass
                .named_child(0)
                .map(|ty| type_name(ctx, ty).to_string());
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                element.interfaces.extend(type_list(ctx, child));
            }
        }
        if node.kind() == "record_declaration" {
            if let Some(components) = node.child_by_field_name("parameters") {
                element.parameters = parameters(ctx, components);
            }
        }
        element.annotations = modifiers.annotations;
        elements.push(element);
    }

    if let Some(body) = node.child_by_field_name("body") {
        pending.push((
            body,
            Scope {
                owner: Some(name),
                interface_members: kind == ElementKind::Interface,
            },
        ));
    }
}

fn method(ctx: &Ctx, node: Node, scope: Scope) -> Option<CodeElement> {
    let name = ctx.text(node.child_by_field_name("name")?);
    let modifiers = Modifiers::read(ctx, node);
    let mut element = ctx.element(name, ElementKind::Method, node)?;

    element.visibility = modifiers.visibility(scope);
    element.is_static = modifiers.is_static;
    element.is_abstract = modifiers.is_abstract
        || (scope.interface_members
            && !modifiers.is_static
            && node.child_by_field_name("body").is_none());
    element.return_type = node
        .child_by_field_name("type")
        .map(|ty| ctx.text(ty).to_string());
    if let Some(params) = node.child_by_field_name("parameters") {
        element.parameters = parameters(ctx, params);
    }
    element.annotations = modifiers.annotations;
    element.owner = scope.owner.map(str::to_string);
    Some(element)
}

/// One element per declarator: `int a, b;` declares two fields.
fn fields(ctx: &Ctx, node: Node, scope: Scope) -> Vec<CodeElement> {
    let modifiers = Modifiers::read(ctx, node);
    let field_type = node
        .child_by_field_name("type")
        .map(|ty| ctx.text(ty).to_string());

    let mut cursor = node.walk();
    node.children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| {
            let name = ctx.text(declarator.child_by_field_name("name")?);
            let mut element = ctx.element(name, ElementKind::Field, declarator)?;
            element.visibility = modifiers.visibility(scope);
            element.is_static = modifiers.is_static || scope.interface_members;
            element.return_type = field_type.clone();
            element.annotations = modifiers.annotations.clone();
            element.owner = scope.owner.map(str::to_string);
            Some(element)
        })
        .collect()
}

fn parameters(ctx: &Ctx, list: Node) -> Vec<Parameter> {
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter_map(|param| match param.kind() {
            "formal_parameter" => Some(Parameter {
                name: ctx.text(param.child_by_field_name("name")?).to_string(),
                type_name: param
                    .child_by_field_name("type")
                    .map(|ty| ctx.text(ty).to_string()),
            }),
            "spread_parameter" => {
                let mut inner = param.walk();
                let children: Vec<Node> = param.named_children(&mut inner).collect();
                let ty = children
                    .iter()
                    .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator")?;
                let declarator = children
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")?;
                Some(Parameter {
                    name: ctx.text(declarator.child_by_field_name("name")?).to_string(),
                    type_name: Some(format!("{}...", ctx.text(*ty))),
                })
            }
            _ => None,
        })
        .collect()
}

fn type_list(ctx: &Ctx, clause: Node) -> Vec<String> {
    let mut cursor = clause.walk();
    let Some(list) = clause
        .named_children(&mut cursor)
        .find(|child| child.kind() == "type_list")
    else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .map(|ty| type_name(ctx, ty).to_string())
        .collect()
}

/// `Base<T>` is reported as `Base`.
fn type_name<'s>(ctx: &Ctx<'s>, ty: Node) -> &'s str {
    if ty.kind() == "generic_type" {
        if let Some(raw) = ty.named_child(0) {
            return ctx.text(raw);
        }
    }
    ctx.text(ty)
}

fn first_error(root: Node) -> Option<Node> {
    if !root.has_error() {
        return None;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|child| child.has_error())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<CodeElement> {
        JavaScanner.scan(source, "src/App.java").unwrap()
    }

    #[test]
    fn test_minimal_class_with_public_method() {
        let elements = scan("public class Greeter {\n    public String greet(String name) { return name; }\n}\n");

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name, "Greeter");
        assert_eq!(elements[0].kind, ElementKind::Class);
        assert_eq!(elements[0].visibility, Visibility::Public);
        assert_eq!(elements[1].name, "greet");
        assert_eq!(elements[1].kind, ElementKind::Method);
        assert_eq!(elements[1].visibility, Visibility::Public);
        assert_eq!(elements[1].return_type.as_deref(), Some("String"));
        assert_eq!(
            elements[1].parameters,
            vec![Parameter {
                name: "name".to_string(),
                type_name: Some("String".to_string()),
            }]
        );
        assert_eq!(elements[1].owner.as_deref(), Some("Greeter"));
        assert_eq!(elements[1].line, 2);
    }

    #[test]
    fn test_inheritance_and_annotations() {
        let source = r#"
@Service
public abstract class UserService extends BaseService<User> implements Auditable, Closeable {
    @Autowired
    private static final int LIMIT = 10, RETRIES = 3;

    @Override
    protected abstract void close();
}
"#;
        let elements = scan(source);
        let class = &elements[0];
        assert_eq!(class.parent.as_deref(), Some("BaseService"));
        assert_eq!(class.interfaces, vec!["Auditable", "Closeable"]);
        assert_eq!(class.annotations, vec!["Service"]);
        assert!(class.is_abstract);

        let fields: Vec<&str> = elements
            .iter()
            .filter(|e| e.kind == ElementKind::Field)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(fields, vec!["LIMIT", "RETRIES"]);
        assert_eq!(elements[1].return_type.as_deref(), Some("int"));
        assert_eq!(elements[1].visibility, Visibility::Private);
        assert!(elements[1].is_static);

        let close = elements.iter().find(|e| e.name == "close").unwrap();
        assert_eq!(close.visibility, Visibility::Protected);
        assert!(close.is_abstract);
        assert_eq!(close.annotations, vec!["Override"]);
    }

    #[test]
    fn test_default_visibility_is_package() {
        let elements = scan("class Hidden { void run() {} }");
        assert_eq!(elements[0].visibility, Visibility::Package);
        assert_eq!(elements[1].visibility, Visibility::Package);
    }

    #[test]
    fn test_interface_members_are_public() {
        let elements = scan("interface Repo extends Reader<Long> { String ID = \"id\"; User find(long id); }");
        assert_eq!(elements[0].kind, ElementKind::Interface);
        assert_eq!(elements[0].interfaces, vec!["Reader"]);
        let find = elements.iter().find(|e| e.name == "find").unwrap();
        assert_eq!(find.visibility, Visibility::Public);
        assert!(find.is_abstract);
        let id = elements.iter().find(|e| e.name == "ID").unwrap();
        assert_eq!(id.kind, ElementKind::Field);
        assert!(id.is_static);
    }

    #[test]
    fn test_enum_record_and_nested_types() {
        let source = r#"
public enum Status {
    ACTIVE, BLOCKED;
    public boolean isActive() { return this == ACTIVE; }
}
record Point(int x, int y) {}
class Outer { static class Inner {} }
@interface Audited {}
"#;
        let summary: Vec<(String, ElementKind, Option<String>)> = scan(source)
            .into_iter()
            .map(|e| (e.name, e.kind, e.owner))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Status".to_string(), ElementKind::Enum, None),
                ("isActive".to_string(), ElementKind::Method, Some("Status".to_string())),
                ("Point".to_string(), ElementKind::Class, None),
                ("Outer".to_string(), ElementKind::Class, None),
                ("Inner".to_string(), ElementKind::Class, Some("Outer".to_string())),
                ("Audited".to_string(), ElementKind::Interface, None),
            ]
        );
    }

    #[test]
    fn test_record_components_become_parameters() {
        let elements = scan("record Point(int x, int y) {}");
        let names: Vec<&str> = elements[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_varargs_parameter() {
        let elements = scan("class Log { void info(String fmt, Object... args) {} }");
        assert_eq!(
            elements[1].parameters[1],
            Parameter {
                name: "args".to_string(),
                type_name: Some("Object...".to_string()),
            }
        );
    }

    #[test]
    fn test_constructors_are_not_elements() {
        let elements = scan("class A { A() {} }");
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = JavaScanner
            .scan("public class Broken {\n  void run( {\n}\n", "Broken.java")
            .unwrap_err();
        assert!(matches!(err, ParserError::SyntaxError { .. }));
    }
}
