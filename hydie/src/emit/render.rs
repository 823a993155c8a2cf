//! RcDoc-based text renderer for an [`ArtifactSet`].
//!
//! Produces six Rust-flavoured source files from the language-neutral
//! artifacts. Layout is width-aware (see [`WIDTH`]); the same artifact set
//! always renders to byte-identical text.
use std::io::{self, Write};

use pretty::{RcDoc, RenderAnnotated};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::emit::{
    AccessorBody, AccessorDecl, ArtifactSet, BodyOrigin, Concrete, Interface, ReadStep, WriteStep,
};

/// Line width used for every rendered file.
pub const WIDTH: usize = 100;

const HEADER: &str = "// @generated by hydie-gen. Do not edit.";

/// Styles used to annotate parts of the rendered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Keyword,
    Ident,
    Type,
    Literal,
    Comment,
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green));
            }
            Style::Type => {
                s.set_fg(Some(Color::Magenta));
            }
            Style::Literal => {
                s.set_fg(Some(Color::Yellow));
            }
            Style::Comment => {
                s.set_dimmed(true);
            }
        }
        s
    }
}

type Doc = RcDoc<'static, Style>;

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub name: &'static str,
    pub contents: String,
}

fn kw(s: &'static str) -> Doc {
    RcDoc::text(s).annotate(Style::Keyword)
}

fn ident(s: impl Into<String>) -> Doc {
    RcDoc::text(s.into()).annotate(Style::Ident)
}

fn ty(s: impl Into<String>) -> Doc {
    RcDoc::text(s.into()).annotate(Style::Type)
}

fn lit(s: impl Into<String>) -> Doc {
    RcDoc::text(s.into()).annotate(Style::Literal)
}

fn comment(s: impl Into<String>) -> Doc {
    RcDoc::text(s.into()).annotate(Style::Comment)
}

fn text(s: impl Into<String>) -> Doc {
    RcDoc::text(s.into())
}

fn tag_literal(tag: u16) -> Doc {
    lit(format!("{tag:#06x}"))
}

/// `snake_case` to `CamelCase`.
pub fn camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn concrete_name(kind: &str) -> String {
    format!("{}Entry", camel(kind))
}

/// `{ <items> }` block with items on their own lines, indented by four.
fn block(head: Doc, items: Vec<Doc>) -> Doc {
    if items.is_empty() {
        return head.append(text(" {}"));
    }
    head.append(text(" {"))
        .append(
            RcDoc::hardline()
                .append(RcDoc::intersperse(items, RcDoc::hardline()))
                .nest(4),
        )
        .append(RcDoc::hardline())
        .append(text("}"))
}

/// Join top-level items with blank lines and prefix the generated header.
fn file(items: Vec<Doc>) -> Doc {
    comment(HEADER)
        .append(RcDoc::hardline())
        .append(RcDoc::hardline())
        .append(RcDoc::intersperse(
            items,
            RcDoc::hardline().append(RcDoc::hardline()),
        ))
        .append(RcDoc::hardline())
}

fn value_type(decl_mandatory: bool, rust_type: &'static str) -> Doc {
    if decl_mandatory {
        ty(rust_type)
    } else {
        ty("Option<").append(ty(rust_type)).append(ty(">"))
    }
}

fn accessor_signatures(decl: &AccessorDecl) -> Vec<Doc> {
    let value = || value_type(decl.mandatory, decl.representation.rust_type());
    let mut out = Vec::new();
    if let Some(category) = &decl.narrowing {
        out.push(comment(format!("/// Narrowed to `{category}` on read.")));
    }
    out.push(
        kw("fn ")
            .append(ident(&decl.getter))
            .append(text("(&self) -> "))
            .append(ty("DataResult<"))
            .append(value())
            .append(ty(">"))
            .append(text(";")),
    );
    out.push(
        kw("fn ")
            .append(ident(&decl.setter))
            .append(text("(&mut self, value: "))
            .append(value())
            .append(text(") -> "))
            .append(ty("DataResult<()>"))
            .append(text(";")),
    );
    out
}

fn interface_doc(interface: &Interface) -> Doc {
    let mut head = kw("pub trait ").append(ty(camel(&interface.node)));
    if !interface.bases.is_empty() {
        let bases = interface.bases.iter().map(|b| ty(camel(b)));
        head = head.append(text(": ")).append(
            RcDoc::intersperse(bases, text(" +").append(RcDoc::line()))
                .nest(4)
                .group(),
        );
    }

    let mut items: Vec<Doc> = interface
        .accessors
        .iter()
        .flat_map(accessor_signatures)
        .collect();

    items.extend(interface.reexports.iter().map(|r| {
        comment(format!(
            "// {} / {}: from `{}`",
            r.getter, r.setter, r.declared_in
        ))
    }));

    for range in &interface.child_ranges {
        let iter = camel(&range.iterator);
        for boundary in [&range.begin, &range.end] {
            items.push(
                kw("fn ")
                    .append(ident(boundary))
                    .append(text("(&self) -> "))
                    .append(ty(format!("{iter}<'_>")))
                    .append(text(";")),
            );
        }
    }

    let kind_note = if interface.instantiable {
        format!("/// Interface of the `{}` kind.", interface.node)
    } else {
        format!("/// Category `{}`.", interface.node)
    };
    comment(kind_note)
        .append(RcDoc::hardline())
        .append(block(head, items))
}

fn body_doc(body: &AccessorBody) -> Vec<Doc> {
    let rust_type = body.representation.rust_type();
    let value = || value_type(body.mandatory, rust_type);
    let slot = lit(format!("{:?}", body.slot));

    let read = match (&body.read, body.mandatory) {
        (ReadStep::Direct, true) => text("self.read_mandatory(").append(slot.clone()),
        (ReadStep::Direct, false) => text("self.read_optional(").append(slot.clone()),
        (ReadStep::Narrow { category }, true) => text("self.read_narrowed(")
            .append(slot.clone())
            .append(text(", "))
            .append(ident(format!("is_{category}"))),
        (ReadStep::Narrow { category }, false) => text("self.read_optional_narrowed(")
            .append(slot.clone())
            .append(text(", "))
            .append(ident(format!("is_{category}"))),
    }
    .append(text(")"));

    let argument = match body.write {
        WriteStep::Direct => text("value"),
        WriteStep::Upcast if body.mandatory => text("value.upcast()"),
        WriteStep::Upcast => text("value.map(EntryId::upcast)"),
    };
    let write = if body.mandatory {
        text("self.write(")
    } else {
        text("self.write_optional(")
    }
    .append(slot)
    .append(text(", "))
    .append(argument)
    .append(text(")"));

    vec![
        block(
            kw("fn ")
                .append(ident(&body.getter))
                .append(text("(&self) -> "))
                .append(ty("DataResult<"))
                .append(value())
                .append(ty(">")),
            vec![read],
        ),
        block(
            kw("fn ")
                .append(ident(&body.setter))
                .append(text("(&mut self, value: "))
                .append(value())
                .append(text(") -> "))
                .append(ty("DataResult<()>")),
            vec![write],
        ),
    ]
}

fn concrete_doc(concrete: &Concrete, interface: Option<&Interface>) -> Doc {
    let name = concrete_name(&concrete.kind);
    let strukt = comment(format!("/// Concrete `{}` entry.", concrete.kind))
        .append(RcDoc::hardline())
        .append(block(
            kw("pub struct ").append(ty(name.clone())),
            vec![text("id: EntryId,")],
        ));

    let inherent = block(
        kw("impl ").append(ty(name.clone())),
        vec![
            kw("pub const ")
                .append(ident("TAG"))
                .append(text(": u16 = "))
                .append(tag_literal(concrete.tag))
                .append(text(";")),
            block(
                kw("pub fn ").append(ident("new")).append(text("(id: EntryId) -> Self")),
                vec![text("Self { id }")],
            ),
        ],
    );

    // Group bodies by the interface that declares them, preserving order of
    // first appearance.
    let mut groups: Vec<(String, Vec<&AccessorBody>)> = Vec::new();
    for body in &concrete.bodies {
        let owner = match &body.origin {
            BodyOrigin::Own => concrete.kind.clone(),
            BodyOrigin::Inherited { declared_in } => declared_in.clone(),
        };
        match groups.iter_mut().find(|(o, _)| *o == owner) {
            Some((_, bodies)) => bodies.push(body),
            None => groups.push((owner, vec![body])),
        }
    }
    if !groups.iter().any(|(o, _)| *o == concrete.kind) {
        groups.insert(0, (concrete.kind.clone(), Vec::new()));
    }

    let impls = groups.into_iter().map(|(owner, bodies)| {
        let mut items: Vec<Doc> = bodies.into_iter().flat_map(body_doc).collect();
        if owner == concrete.kind {
            for range in interface.iter().flat_map(|i| i.child_ranges.iter()) {
                let iter = camel(&range.iterator);
                let child = format!("{}::TAG", concrete_name(&range.child_kind));
                for (boundary, cursor) in [(&range.begin, "begin"), (&range.end, "end")] {
                    items.push(block(
                        kw("fn ")
                            .append(ident(boundary))
                            .append(text("(&self) -> "))
                            .append(ty(format!("{iter}<'_>"))),
                        vec![text(format!("self.children({child}).{cursor}()"))],
                    ));
                }
            }
        }
        block(
            kw("impl ")
                .append(ty(camel(&owner)))
                .append(kw(" for "))
                .append(ty(name.clone())),
            items,
        )
    });

    RcDoc::intersperse(
        std::iter::once(strukt)
            .chain(std::iter::once(inherent))
            .chain(impls),
        RcDoc::hardline().append(RcDoc::hardline()),
    )
}

fn forward_decls_doc(set: &ArtifactSet) -> Doc {
    let variants = set
        .forward_decls
        .iter()
        .map(|f| {
            ty(camel(&f.kind))
                .append(text(" = "))
                .append(tag_literal(f.tag))
                .append(text(","))
        })
        .collect();
    file(vec![
        comment("/// Every instantiable entry kind, by name.")
            .append(RcDoc::hardline())
            .append(text("#[repr(u16)]"))
            .append(RcDoc::hardline())
            .append(block(kw("pub enum ").append(ty("KindTag")), variants)),
    ])
}

fn interfaces_doc(set: &ArtifactSet) -> Doc {
    file(set.interfaces.iter().map(interface_doc).collect())
}

fn concrete_file_doc(set: &ArtifactSet) -> Doc {
    file(
        set.concretes
            .iter()
            .map(|c| concrete_doc(c, set.interface(&c.kind)))
            .collect(),
    )
}

fn child_iters_doc(set: &ArtifactSet) -> Doc {
    file(
        set.child_iters
            .iter()
            .map(|c| {
                kw("pub type ")
                    .append(ty(format!("{}<'a>", camel(&c.name))))
                    .append(text(" = "))
                    .append(ty("ChildCursor<'a>"))
                    .append(text(";"))
            })
            .collect(),
    )
}

fn dispatch_doc(set: &ArtifactSet) -> Doc {
    let mut arms: Vec<Doc> = set
        .dispatch
        .cases
        .iter()
        .map(|c| {
            tag_literal(c.tag)
                .append(text(" => Ok(Box::new("))
                .append(ty(concrete_name(&c.kind)))
                .append(text("::new(id))),"))
        })
        .collect();
    arms.push(text("other => Err(DataError::UnrecognizedKind(other)),"));

    file(vec![
        comment("/// Construct the concrete entry registered for `tag`.")
            .append(RcDoc::hardline())
            .append(block(
                kw("pub fn ")
                    .append(ident("construct"))
                    .append(text("(tag: u16, id: EntryId) -> "))
                    .append(ty("DataResult<Box<dyn Any>>")),
                vec![block(kw("match ").append(ident("tag")), arms)],
            )),
    ])
}

fn predicates_doc(set: &ArtifactSet) -> Doc {
    file(
        set.predicates
            .iter()
            .map(|p| {
                let test = if p.disjuncts.is_empty() {
                    lit("false")
                } else {
                    let tags = p.disjuncts.iter().map(|d| tag_literal(d.tag));
                    text("matches!(tag, ")
                        .append(
                            RcDoc::intersperse(tags, text(" |").append(RcDoc::line()))
                                .nest(4)
                                .group(),
                        )
                        .append(text(")"))
                };
                comment(format!("/// Membership test for category `{}`.", p.category))
                    .append(RcDoc::hardline())
                    .append(block(
                        kw("pub fn ")
                            .append(ident(&p.function))
                            .append(text("(tag: u16) -> bool")),
                        vec![test],
                    ))
            })
            .collect(),
    )
}

/// Build the annotated documents of every output file, in a fixed order.
pub fn documents(set: &ArtifactSet) -> Vec<(&'static str, Doc)> {
    vec![
        ("forward_decls.rs", forward_decls_doc(set)),
        ("interfaces.rs", interfaces_doc(set)),
        ("concrete.rs", concrete_file_doc(set)),
        ("child_iters.rs", child_iters_doc(set)),
        ("dispatch.rs", dispatch_doc(set)),
        ("predicates.rs", predicates_doc(set)),
    ]
}

/// Render every output file to plain text.
pub fn render(set: &ArtifactSet) -> Vec<RenderedFile> {
    documents(set)
        .into_iter()
        .map(|(name, doc)| {
            let mut contents = String::new();
            // Writing into a String cannot fail.
            let _ = doc.render_fmt(WIDTH, &mut contents);
            RenderedFile { name, contents }
        })
        .collect()
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Render one document with colours to a termcolor sink.
pub fn render_colored<W: WriteColor + Write>(doc: &Doc, out: &mut W) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(WIDTH, &mut cw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_names() {
        assert_eq!(camel("compile_unit"), "CompileUnit");
        assert_eq!(camel("members_iterator"), "MembersIterator");
        assert_eq!(camel("type"), "Type");
    }
}
