use crate::{
    FragmentRecord, GeneratorConfig, QueryRecord, naming, separated_by,
    writer::{Context, Section},
};
use std::fmt::Write;
use weave_core::ParamDefinition;

/// Printer turning extracted declarations into TypeScript units.
pub trait TsWriter {
    fn config(&self) -> &GeneratorConfig;

    fn root(&self) -> &str {
        &self.config().root_binding
    }

    fn write_indent(&self, context: &Context, out: &mut String) {
        for _ in 0..context.indent {
            out.push_str("  ");
        }
    }

    fn write_line(&self, context: &Context, out: &mut String, line: &str) {
        self.write_indent(context, out);
        out.push_str(line);
        out.push('\n');
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_string_quoted(&self, context: &Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\\\"");
        out.push('"');
    }

    /// Object literal key, quoted when it is not an identifier.
    fn write_property_key(&self, context: &Context, out: &mut String, key: &str) {
        if naming::is_identifier(key) {
            out.push_str(key);
        } else {
            self.write_string_quoted(context, out, key);
        }
    }

    fn write_import(
        &self,
        context: &Context,
        out: &mut String,
        default: Option<&str>,
        names: &[&str],
        module: &str,
    ) {
        self.write_indent(context, out);
        out.push_str("import ");
        if let Some(default) = default {
            out.push_str(default);
            if !names.is_empty() {
                out.push_str(", ");
            }
        }
        if !names.is_empty() {
            out.push_str("{ ");
            separated_by(out, names, |out, v| out.push_str(v), ", ");
            out.push_str(" }");
        }
        out.push_str(" from ");
        self.write_string_quoted(context, out, module);
        out.push_str(";\n");
    }

    fn write_fragment_imports(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        let config = self.config();
        if fragment.is_query() {
            self.write_import(
                context,
                out,
                Some(self.root()),
                &[],
                &config.runtime_path("index"),
            );
        } else {
            self.write_import(
                context,
                out,
                None,
                &["$scopify", "ObjectTypeExpression"],
                &config.runtime_path("typesystem"),
            );
            self.write_import(
                context,
                out,
                None,
                &["$linkPropify"],
                &config.runtime_path("syntax"),
            );
            self.write_import(
                context,
                out,
                Some(self.root()),
                &["type Cardinality"],
                &config.runtime_path("index"),
            );
        }
        for child in fragment.children() {
            let names = [
                child.to_owned(),
                format!("{child}Masked"),
                format!("{child}Raw"),
                format!("{child}Definition"),
                format!("{child}Params"),
            ];
            let names: Vec<_> = names.iter().map(String::as_str).collect();
            self.write_import(context, out, None, &names, &format!("./{child}"));
        }
    }

    /// Selection shape accepted by the accessors of entity fragments.
    fn write_expr_shape_type(&self, context: &Context, out: &mut String) {
        let inner = context.nested();
        self.write_line(
            context,
            out,
            "type ExprShape<Expr extends ObjectTypeExpression> = $scopify<Expr[\"__element__\"]> &",
        );
        self.write_line(&inner, out, "$linkPropify<{");
        self.write_line(
            &inner.nested(),
            out,
            "[k in keyof Expr]: k extends \"__cardinality__\" ? typeof Cardinality.One : Expr[k];",
        );
        self.write_line(&inner, out, "}>;");
    }

    fn write_type_expr(&self, _context: &Context, out: &mut String, type_name: &str) {
        let _ = write!(out, "{}.{}", self.root(), type_name);
    }

    fn write_params(
        &self,
        context: &Context,
        out: &mut String,
        name: &str,
        params: &[ParamDefinition],
        children: &[&str],
    ) {
        self.write_indent(context, out);
        let _ = write!(out, "export const {name}Params = {{");
        if params.is_empty() && children.is_empty() {
            out.push_str("} as const;\n");
            return;
        }
        out.push('\n');
        let inner = context.nested();
        for param in params {
            self.write_indent(&inner, out);
            self.write_param(&inner, out, param);
            out.push_str(",\n");
        }
        for child in children {
            self.write_line(&inner, out, &format!("...{child}Params,"));
        }
        self.write_line(context, out, "} as const;");
    }

    fn write_param(&self, context: &Context, out: &mut String, param: &ParamDefinition) {
        self.write_property_key(context, out, &param.name);
        out.push_str(": ");
        if param.optional {
            let _ = write!(out, "{}.optional({})", self.root(), param.type_);
        } else {
            out.push_str(&param.type_);
        }
    }

    fn write_ref_type(&self, context: &Context, out: &mut String, name: &str) {
        self.write_line(context, out, &format!("export type {name}Ref = {{"));
        self.write_line(&context.nested(), out, &format!("{name}: true;"));
        self.write_line(context, out, "};");
    }

    /// The declaring call, with spreads pointing to the raw accessors inside `Raw`.
    fn write_fragment_text(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        match context.section {
            Section::Raw => out.push_str(&fragment.raw_text()),
            Section::Plain => out.push_str(&fragment.text),
        }
    }

    fn write_definition(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        self.write_indent(context, out);
        let _ = write!(out, "export const {}Definition = ", fragment.name);
        self.write_fragment_text(context, out, fragment);
        out.push_str(";\n");
    }

    fn write_shape_parameter(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        if let Some(type_name) = fragment.type_name() {
            out.push_str("shape: ExprShape<typeof ");
            self.write_type_expr(context, out, type_name);
            out.push('>');
        }
    }

    /// Arguments of the `select` wrapping a fragment shape.
    fn write_select_target(&self, _context: &Context, out: &mut String, fragment: &FragmentRecord) {
        if !fragment.is_query() {
            out.push_str("shape, ");
        }
    }

    fn write_masked(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        let inner = context.nested();
        let name = &fragment.name;
        let root = self.root();
        self.write_indent(context, out);
        let _ = write!(out, "export function {name}Masked(");
        self.write_shape_parameter(context, out, fragment);
        out.push_str(") {\n");
        let mask = format!("{name}: {root}.select({root}.bool(true)),");
        match fragment.type_name() {
            Some(type_name) => {
                self.write_indent(&inner, out);
                let _ = write!(out, "const FragmentMaskType = {root}.shape(");
                self.write_type_expr(&inner, out, type_name);
                out.push_str(", () => ({\n");
                self.write_line(&inner.nested(), out, &mask);
                self.write_line(&inner, out, "}));");
                self.write_line(&inner, out, "type AsType = ReturnType<typeof FragmentMaskType>;");
            }
            None => {
                self.write_line(&inner, out, "const FragmentMaskType = {");
                self.write_line(&inner.nested(), out, &mask);
                self.write_line(&inner, out, "};");
                self.write_line(&inner, out, "type AsType = typeof FragmentMaskType;");
            }
        }
        out.push('\n');
        self.write_line(&inner, out, "return {");
        self.write_indent(&inner.nested(), out);
        let _ = write!(out, "__{name}: {root}.select(");
        self.write_select_target(&inner, out, fragment);
        let _ = writeln!(out, "{name}Definition.shape()),");
        self.write_line(&inner, out, "} as unknown as AsType;");
        self.write_line(context, out, "}");
    }

    fn write_raw(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        let context = context.switch_section(Section::Raw);
        let inner = context.nested();
        let name = &fragment.name;
        self.write_indent(&context, out);
        let _ = write!(out, "export function {name}Raw(");
        self.write_shape_parameter(&context, out, fragment);
        out.push_str(") {\n");
        self.write_line(&inner, out, "return {");
        self.write_indent(&inner.nested(), out);
        let _ = write!(out, "__{name}: {}.select(", self.root());
        self.write_select_target(&context, out, fragment);
        self.write_fragment_text(&context, out, fragment);
        out.push_str(".shape()),\n");
        self.write_line(&inner, out, "};");
        self.write_line(&context, out, "}");
    }

    /// The masked accessor carrying the fragment metadata.
    fn write_combined(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        let inner = context.nested();
        let name = &fragment.name;
        self.write_line(
            context,
            out,
            &format!("export const {name}: typeof {name}Masked & {{"),
        );
        self.write_line(&inner, out, "fragmentName: string;");
        self.write_line(&inner, out, &format!("raw: typeof {name}Raw;"));
        self.write_line(&inner, out, &format!("definition: typeof {name}Definition;"));
        if let Some(type_name) = fragment.type_name() {
            self.write_indent(&inner, out);
            out.push_str("expr: typeof ");
            self.write_type_expr(&inner, out, type_name);
            out.push_str(";\n");
        }
        self.write_line(context, out, &format!("}} = Object.assign({name}Masked, {{"));
        self.write_indent(&inner, out);
        out.push_str("fragmentName: ");
        self.write_string_quoted(&inner, out, name);
        out.push_str(",\n");
        self.write_line(&inner, out, &format!("raw: {name}Raw,"));
        self.write_line(&inner, out, &format!("definition: {name}Definition,"));
        if let Some(type_name) = fragment.type_name() {
            self.write_indent(&inner, out);
            out.push_str("expr: ");
            self.write_type_expr(&inner, out, type_name);
            out.push_str(",\n");
        }
        self.write_line(context, out, "});");
    }

    fn write_fragment_unit(&self, context: &Context, out: &mut String, fragment: &FragmentRecord) {
        let children = fragment.children();
        self.write_fragment_imports(context, out, fragment);
        out.push('\n');
        if !fragment.is_query() {
            self.write_expr_shape_type(context, out);
            out.push('\n');
        }
        self.write_params(context, out, &fragment.name, &fragment.params, &children);
        out.push('\n');
        self.write_ref_type(context, out, &fragment.name);
        out.push('\n');
        self.write_definition(context, out, fragment);
        out.push('\n');
        self.write_masked(context, out, fragment);
        out.push('\n');
        self.write_raw(context, out, fragment);
        out.push('\n');
        self.write_combined(context, out, fragment);
    }

    fn write_query_unit(&self, context: &Context, out: &mut String, query: &QueryRecord) {
        let config = self.config();
        let children = query.children();
        self.write_import(
            context,
            out,
            Some(self.root()),
            &[],
            &config.runtime_path("index"),
        );
        for child in &children {
            self.write_import(
                context,
                out,
                None,
                &[format!("{child}Params").as_str()],
                &format!("../{}/{child}", config.fragments_dir),
            );
        }
        out.push('\n');
        self.write_params(context, out, &query.name, &query.params, &children);
    }

    /// Aggregate unit re-exporting every fragment and registering its definition.
    fn write_manifest(&self, context: &Context, out: &mut String, fragments: &[&FragmentRecord]) {
        let directory = &self.config().fragments_dir;
        if fragments.is_empty() {
            self.write_import(context, out, Some(self.root()), &[], "./index");
            out.push('\n');
            self.write_line(
                context,
                out,
                &format!(
                    "const fragmentMap = new Map<string, ReturnType<typeof {}.fragment>>();",
                    self.root()
                ),
            );
            out.push('\n');
            self.write_line(context, out, "export { fragmentMap };");
            return;
        }
        for fragment in fragments {
            let name = &fragment.name;
            self.write_import(
                context,
                out,
                None,
                &[format!("{name}Definition").as_str()],
                &format!("./{directory}/{name}"),
            );
        }
        out.push('\n');
        for fragment in fragments {
            self.write_indent(context, out);
            out.push_str("export * from ");
            self.write_string_quoted(context, out, &format!("./{directory}/{}", fragment.name));
            out.push_str(";\n");
        }
        out.push('\n');
        self.write_indent(context, out);
        out.push_str("const fragmentMap = new Map<string, ");
        separated_by(
            out,
            fragments,
            |out, v| {
                let _ = write!(out, "typeof {}Definition", v.name);
            },
            " | ",
        );
        out.push_str(">();\n\n");
        for fragment in fragments {
            self.write_indent(context, out);
            out.push_str("fragmentMap.set(");
            self.write_string_quoted(context, out, &fragment.name);
            let _ = writeln!(out, ", {}Definition);", fragment.name);
        }
        out.push('\n');
        self.write_line(context, out, "export { fragmentMap };");
    }
}

/// Writer with the stock layout of the generated units.
#[derive(Debug, Clone, Default)]
pub struct GenericTsWriter {
    config: GeneratorConfig,
}

impl GenericTsWriter {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl TsWriter for GenericTsWriter {
    fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}
