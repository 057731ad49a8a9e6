//! The loaded schema: files, their declared types and the reference graph
//! between those types.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    ServiceDescriptorProto,
};
use crate::Error;

/// The facet of a declared type that reachability needs.
pub trait Reachable {
    /// Fully-qualified name, without a leading dot.
    fn name(&self) -> &str;
    /// Names of the types this one depends on.
    fn references(&self) -> &BTreeSet<String>;
}

/// Kind-specific payload of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Message(DescriptorProto),
    Enum(EnumDescriptorProto),
    Service(ServiceDescriptorProto),
}

impl TypeKind {
    /// Short label used in logs and outlines.
    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Message(_) => "message",
            TypeKind::Enum(_) => "enum",
            TypeKind::Service(_) => "service",
        }
    }
}

/// A declared message, enum or service.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    name: String,
    file: String,
    parent: Option<String>,
    index: usize,
    references: BTreeSet<String>,
    kind: TypeKind,
}

impl TypeNode {
    /// Fully-qualified name, e.g. `pkg.Outer.Inner`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring `.proto` file.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Fully-qualified name of the enclosing message for nested declarations.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Position among the declarations of the same kind in the enclosing file
    /// or message, as loaded.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn references(&self) -> &BTreeSet<String> {
        &self.references
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }
}

impl Reachable for TypeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn references(&self) -> &BTreeSet<String> {
        &self.references
    }
}

/// A `.proto` file and the types it declares, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFile {
    name: String,
    package: String,
    types: Vec<TypeNode>,
    /// File-level descriptor fields; its messages, enums and services live in `types`.
    descriptor: FileDescriptorProto,
}

impl ProtoFile {
    /// File name relative to its source directory, e.g. `pkg/person.proto`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Declared types; nested types follow their enclosing message.
    pub fn types(&self) -> &[TypeNode] {
        &self.types
    }

    pub fn descriptor(&self) -> &FileDescriptorProto {
        &self.descriptor
    }
}

/// A closed set of files whose type references all resolve within the set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    files: Vec<ProtoFile>,
    /// `import public` targets of every loaded file, including files pruned
    /// away since.
    public_imports: BTreeMap<String, Vec<String>>,
}

impl Schema {
    /// Build the type graph for a FileDescriptorSet.
    ///
    /// The set must be closed (protoc's `--include_imports` guarantees this):
    /// any reference to an undeclared type fails with
    /// [`Error::UnresolvedReference`].
    pub fn from_descriptor_set(fds: FileDescriptorSet) -> Result<Self, Error> {
        let public_imports = fds
            .file
            .iter()
            .filter_map(|file| {
                let name = file.name.clone()?;
                let imports: Vec<String> = file
                    .public_dependency
                    .iter()
                    .filter_map(|&index| file.dependency.get(usize::try_from(index).ok()?))
                    .cloned()
                    .collect();
                (!imports.is_empty()).then_some((name, imports))
            })
            .collect();
        let files = fds
            .file
            .into_iter()
            .map(build_file)
            .collect::<Result<Vec<_>, _>>()?;
        let schema = Self {
            files,
            public_imports,
        };
        schema.check_closed()?;
        Ok(schema)
    }

    pub fn files(&self) -> &[ProtoFile] {
        &self.files
    }

    /// Look up a file by name.
    pub fn file(&self, name: &str) -> Option<&ProtoFile> {
        self.files.iter().find(|file| file.name == name)
    }

    /// Every declared type, file by file.
    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.files.iter().flat_map(|file| file.types.iter())
    }

    /// Look up a type by fully-qualified name.
    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        let name = name.trim_start_matches('.');
        self.types().find(|node| node.name == name)
    }

    pub fn type_count(&self) -> usize {
        self.files.iter().map(|file| file.types.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files still in the schema that `file` makes visible to its importers
    /// through `import public`, following chains through files no longer in
    /// the schema.
    pub(crate) fn public_reexports<'a>(&'a self, file: &'a str) -> Vec<&'a str> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![file];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            for import in self.public_imports.get(current).into_iter().flatten() {
                if self.file(import).is_none() {
                    stack.push(import);
                } else if !found.contains(&import.as_str()) {
                    found.push(import.as_str());
                }
            }
        }
        found
    }

    /// Keep only the types accepted by `keep`, dropping files left empty.
    pub(crate) fn retain(self, mut keep: impl FnMut(&TypeNode) -> bool) -> Self {
        let files = self
            .files
            .into_iter()
            .filter_map(|mut file| {
                file.types.retain(|node| keep(node));
                (!file.types.is_empty()).then_some(file)
            })
            .collect();
        Self {
            files,
            public_imports: self.public_imports,
        }
    }

    fn check_closed(&self) -> Result<(), Error> {
        let declared: HashSet<&str> = self.types().map(TypeNode::name).collect();
        for node in self.types() {
            if let Some(missing) = node
                .references
                .iter()
                .find(|reference| !declared.contains(reference.as_str()))
            {
                return Err(Error::UnresolvedReference {
                    referrer: node.name.clone(),
                    reference: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Outline of the schema: each file followed by its indented types.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(f, "{}", file.name)?;
            for node in &file.types {
                writeln!(f, "  {} {}", node.kind.label(), node.name)?;
            }
        }
        Ok(())
    }
}

fn build_file(mut descriptor: FileDescriptorProto) -> Result<ProtoFile, Error> {
    let name = descriptor.name.clone().ok_or(Error::MissingName("file"))?;
    let package = descriptor.package.clone().unwrap_or_default();
    let prefix = if package.is_empty() {
        String::new()
    } else {
        format!("{}.", package)
    };

    let mut builder = FileBuilder {
        file: &name,
        types: Vec::new(),
    };
    for (index, message) in std::mem::take(&mut descriptor.message_type).into_iter().enumerate() {
        builder.add_message(&prefix, None, index, message)?;
    }
    for (index, enumeration) in std::mem::take(&mut descriptor.enum_type).into_iter().enumerate() {
        builder.add_enum(&prefix, None, index, enumeration)?;
    }
    for (index, service) in std::mem::take(&mut descriptor.service).into_iter().enumerate() {
        builder.add_service(&prefix, index, service)?;
    }

    let types = builder.types;
    Ok(ProtoFile {
        name,
        package,
        types,
        descriptor,
    })
}

/// Flattens one file's declarations into [`TypeNode`]s.
struct FileBuilder<'a> {
    file: &'a str,
    types: Vec<TypeNode>,
}

impl FileBuilder<'_> {
    fn add_message(
        &mut self,
        prefix: &str,
        parent: Option<&str>,
        index: usize,
        message: DescriptorProto,
    ) -> Result<(), Error> {
        let simple_name = message.name.as_deref().ok_or(Error::MissingName("message"))?;
        let name = format!("{}{}", prefix, simple_name);
        let nested_prefix = format!("{}.", name);

        let mut references = BTreeSet::new();
        if let Some(parent) = parent {
            references.insert(parent.to_string());
        }
        for field in message.field.iter().chain(&message.extension) {
            if let Some(type_name) = field.referenced_type() {
                references.insert(qualified(type_name));
            }
            if let Some(extendee) = &field.extendee {
                references.insert(qualified(extendee));
            }
        }
        let nested_names = message
            .nested_type
            .iter()
            .map(|nested| nested.name.as_deref())
            .chain(message.enum_type.iter().map(|nested| nested.name.as_deref()));
        for nested in nested_names {
            let nested = nested.ok_or(Error::MissingName("nested type"))?;
            references.insert(format!("{}{}", nested_prefix, nested));
        }

        let nested_messages = message.nested_type.clone();
        let nested_enums = message.enum_type.clone();
        self.types.push(TypeNode {
            name: name.clone(),
            file: self.file.to_string(),
            parent: parent.map(str::to_owned),
            index,
            references,
            kind: TypeKind::Message(message),
        });

        for (index, nested) in nested_messages.into_iter().enumerate() {
            self.add_message(&nested_prefix, Some(&name), index, nested)?;
        }
        for (index, nested) in nested_enums.into_iter().enumerate() {
            self.add_enum(&nested_prefix, Some(&name), index, nested)?;
        }
        Ok(())
    }

    fn add_enum(
        &mut self,
        prefix: &str,
        parent: Option<&str>,
        index: usize,
        enumeration: EnumDescriptorProto,
    ) -> Result<(), Error> {
        let simple_name = enumeration.name.as_deref().ok_or(Error::MissingName("enum"))?;
        self.types.push(TypeNode {
            name: format!("{}{}", prefix, simple_name),
            file: self.file.to_string(),
            parent: parent.map(str::to_owned),
            index,
            references: parent.map(str::to_owned).into_iter().collect(),
            kind: TypeKind::Enum(enumeration),
        });
        Ok(())
    }

    fn add_service(
        &mut self,
        prefix: &str,
        index: usize,
        service: ServiceDescriptorProto,
    ) -> Result<(), Error> {
        let simple_name = service.name.as_deref().ok_or(Error::MissingName("service"))?;
        let references = service
            .method
            .iter()
            .flat_map(|method| [&method.input_type, &method.output_type])
            .flatten()
            .map(|type_name| qualified(type_name))
            .collect();
        self.types.push(TypeNode {
            name: format!("{}{}", prefix, simple_name),
            file: self.file.to_string(),
            parent: None,
            index,
            references,
            kind: TypeKind::Service(service),
        });
        Ok(())
    }
}

/// Strip the leading dot protoc puts on resolved type names.
fn qualified(type_name: &str) -> String {
    type_name.trim_start_matches('.').to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptorProto, MethodDescriptorProto};

    pub(crate) fn message_field(name: &str, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(1),
            r#type: Some(11), // TYPE_MESSAGE
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn make_message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    pub(crate) fn make_file(
        name: &str,
        package: &str,
        messages: Vec<DescriptorProto>,
    ) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            message_type: messages,
            ..Default::default()
        }
    }

    pub(crate) fn schema_of(files: Vec<FileDescriptorProto>) -> Schema {
        Schema::from_descriptor_set(FileDescriptorSet { file: files }).unwrap()
    }

    fn names(schema: &Schema) -> Vec<&str> {
        schema.types().map(TypeNode::name).collect()
    }

    #[test]
    fn test_field_references() {
        // message TypeA { optional TypeB b = 1; }
        let schema = schema_of(vec![make_file(
            "a.proto",
            "pkg",
            vec![
                make_message("TypeA", vec![message_field("b", ".pkg.TypeB")]),
                make_message("TypeB", vec![]),
            ],
        )]);

        let a = schema.get("pkg.TypeA").unwrap();
        assert!(a.is_top_level());
        assert_eq!(a.file(), "a.proto");
        assert_eq!(a.references().iter().collect::<Vec<_>>(), vec!["pkg.TypeB"]);
        assert!(schema.get("pkg.TypeB").unwrap().references().is_empty());
        assert_eq!(schema.get(".pkg.TypeA"), Some(a));
    }

    #[test]
    fn test_scalar_fields_are_not_references() {
        let scalar = FieldDescriptorProto {
            name: Some("id".to_string()),
            number: Some(1),
            r#type: Some(5), // TYPE_INT32
            ..Default::default()
        };
        let schema = schema_of(vec![make_file(
            "a.proto",
            "pkg",
            vec![make_message("TypeA", vec![scalar])],
        )]);
        assert!(schema.get("pkg.TypeA").unwrap().references().is_empty());
    }

    #[test]
    fn test_nested_types_are_flattened() {
        // message Outer { message Inner {} enum Kind {} }
        let mut outer = make_message("Outer", vec![]);
        outer.nested_type.push(make_message("Inner", vec![]));
        outer.enum_type.push(EnumDescriptorProto {
            name: Some("Kind".to_string()),
            ..Default::default()
        });
        let schema = schema_of(vec![make_file("a.proto", "pkg", vec![outer])]);

        assert_eq!(names(&schema), vec!["pkg.Outer", "pkg.Outer.Inner", "pkg.Outer.Kind"]);
        let outer = schema.get("pkg.Outer").unwrap();
        assert!(outer.references().contains("pkg.Outer.Inner"));
        assert!(outer.references().contains("pkg.Outer.Kind"));

        let inner = schema.get("pkg.Outer.Inner").unwrap();
        assert_eq!(inner.parent(), Some("pkg.Outer"));
        assert_eq!(inner.index(), 0);
        assert!(inner.references().contains("pkg.Outer"));
        assert_eq!(schema.get("pkg.Outer.Kind").unwrap().kind().label(), "enum");
    }

    #[test]
    fn test_service_references_method_types() {
        let mut file = make_file(
            "svc.proto",
            "svc",
            vec![make_message("Req", vec![]), make_message("Resp", vec![])],
        );
        file.service.push(ServiceDescriptorProto {
            name: Some("Api".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Call".to_string()),
                input_type: Some(".svc.Req".to_string()),
                output_type: Some(".svc.Resp".to_string()),
            }],
            ..Default::default()
        });
        let schema = schema_of(vec![file]);

        let api = schema.get("svc.Api").unwrap();
        assert_eq!(api.kind().label(), "service");
        assert_eq!(
            api.references().iter().collect::<Vec<_>>(),
            vec!["svc.Req", "svc.Resp"]
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let fds = FileDescriptorSet {
            file: vec![make_file(
                "a.proto",
                "pkg",
                vec![make_message("TypeA", vec![message_field("b", ".other.Missing")])],
            )],
        };
        match Schema::from_descriptor_set(fds) {
            Err(Error::UnresolvedReference { referrer, reference }) => {
                assert_eq!(referrer, "pkg.TypeA");
                assert_eq!(reference, "other.Missing");
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_index_counts_each_kind_separately() {
        let mut file = make_file(
            "a.proto",
            "pkg",
            vec![make_message("A", vec![]), make_message("B", vec![])],
        );
        file.enum_type.push(EnumDescriptorProto {
            name: Some("Kind".to_string()),
            ..Default::default()
        });
        let schema = schema_of(vec![file]);

        assert_eq!(schema.get("pkg.A").unwrap().index(), 0);
        assert_eq!(schema.get("pkg.B").unwrap().index(), 1);
        assert_eq!(schema.get("pkg.Kind").unwrap().index(), 0);
    }

    #[test]
    fn test_public_reexports_follow_pruned_files() {
        // f imports g, g publicly imports h, h publicly imports i
        let mut g = make_file("g.proto", "g", vec![make_message("G", vec![])]);
        g.dependency = vec!["h.proto".to_string()];
        g.public_dependency = vec![0];
        let mut h = make_file("h.proto", "h", vec![make_message("H", vec![])]);
        h.dependency = vec!["i.proto".to_string()];
        h.public_dependency = vec![0];
        let i = make_file("i.proto", "i", vec![make_message("I", vec![])]);
        let schema = schema_of(vec![i, h, g]);

        assert_eq!(schema.public_reexports("g.proto"), vec!["h.proto"]);
        assert!(schema.public_reexports("i.proto").is_empty());

        let pruned = schema.retain(|node| node.name() == "i.I");
        assert_eq!(pruned.public_reexports("g.proto"), vec!["i.proto"]);
    }

    #[test]
    fn test_empty_package() {
        let schema = schema_of(vec![make_file(
            "bare.proto",
            "",
            vec![make_message("Bare", vec![message_field("me", ".Bare")])],
        )]);
        assert_eq!(names(&schema), vec!["Bare"]);
        assert_eq!(schema.files()[0].package(), "");
    }

    #[test]
    fn test_outline() {
        let schema = schema_of(vec![
            make_file(
                "a.proto",
                "pkg",
                vec![
                    make_message("TypeA", vec![message_field("b", ".pkg.TypeB")]),
                    make_message("TypeB", vec![]),
                ],
            ),
            make_file("b.proto", "other", vec![make_message("Type", vec![])]),
        ]);
        assert_eq!(schema.type_count(), 3);
        insta::assert_snapshot!(schema.to_string().trim_end(), @r"
        a.proto
          message pkg.TypeA
          message pkg.TypeB
        b.proto
          message other.Type
        ");
    }
}
