//! Derive macro for keel table models.
//!
//! This crate provides `#[derive(Model)]`. The macro reads the struct's
//! attributes into a [`ModelDeclaration`], runs the same extractor and
//! per-table validator the run-time path uses, and reports every problem as
//! a compile error pointing at the offending field.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitBool,
    LitStr, Meta, PathArguments, Token, Type,
};

use keel_core::declaration::{
    ColumnAnnotation, FieldDeclaration, ModelDeclaration, PrimaryKeyAnnotation,
};
use keel_core::descriptor::{
    Collate, ColumnDescriptor, ForeignKeyAction, Helpers, OnConflict, StorageType, TableDescriptor,
};
use keel_core::error::ValidationError;
use keel_core::extract::extract;
use keel_core::validate::validate_table;

/// Derives `keel_core::model::Model` and the typed column surface.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - SQL table name (optional, defaults to
///   the struct name)
///
/// # Field Attributes
///
/// Only fields carrying `#[column]` or `#[primary_key]` are mapped; the others
/// are filled with `Default::default()` when a row is read.
///
/// - `#[column(name = "...")]` - column name (defaults to the field name)
/// - `#[column(indexed)]`, `#[column(unique)]` - plain or unique index
/// - `#[column(on_conflict = "replace")]` - conflict algorithm
/// - `#[column(collate = "nocase")]` - collating sequence
/// - `#[column(default_expr = "0")]` - raw SQL default expression
/// - `#[column(storage_type = "TEXT")]` - storage class override
/// - `#[column(helpers(eq, in_list, order_asc))]` - builder helpers
///   (defaults to `auto`)
/// - `#[column(references = "Category", on_delete = "cascade")]` - reference
///   to another table's primary key
/// - `#[primary_key(auto = false, autoincrement, on_conflict = "...")]`
///
/// # Generated Items
///
/// For a struct `Item` with a field `name`, this macro generates:
///
/// - `impl Model for Item`
/// - `ItemName` - a zero-sized column type implementing `Column` and the
///   `Supports*` traits enabled by the column's helpers
/// - `Item::name()` - an accessor returning `ItemName`
#[proc_macro_derive(Model, attributes(table, column, primary_key))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_model_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    span: Span,
}

fn derive_model_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Model derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Model derive only supports structs",
            ));
        }
    };

    let mut declaration = ModelDeclaration::new(struct_name.to_string());
    declaration.table = parse_table_name(&input.attrs)?;

    let mut infos = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "unnamed field"));
        };
        let ty = &field.ty;
        let rust_type = quote!(#ty).to_string().replace(' ', "");
        declaration.fields.push(FieldDeclaration {
            name: ident.to_string(),
            rust_type,
            column: parse_column_attrs(&field.attrs)?,
            primary_key: parse_primary_key_attrs(&field.attrs)?,
        });
        infos.push(FieldInfo {
            span: ident.span(),
            ident,
            ty: ty.clone(),
        });
    }

    let span_of = |field: &str| {
        infos
            .iter()
            .find(|f| f.ident == field)
            .map_or_else(|| struct_name.span(), |f| f.span)
    };

    let table = extract(&declaration).map_err(|errors| {
        combine(
            errors
                .iter()
                .map(|e| syn::Error::new(span_of(e.field()), e.to_string())),
        )
    })?;

    let problems = validate_table(&table);
    if !problems.is_empty() {
        return Err(combine(problems.iter().map(|e| {
            let span = match e {
                ValidationError::DuplicateColumnName { field, .. } => span_of(field),
                _ => struct_name.span(),
            };
            syn::Error::new(span, e.to_string())
        })));
    }

    Ok(generate(input, &table, &infos))
}

fn combine(errors: impl Iterator<Item = syn::Error>) -> syn::Error {
    let mut combined: Option<syn::Error> = None;
    for error in errors {
        match &mut combined {
            Some(all) => all.combine(error),
            None => combined = Some(error),
        }
    }
    combined.unwrap_or_else(|| syn::Error::new(Span::call_site(), "invalid model"))
}

// ============================================================================
// Code generation
// ============================================================================

fn generate(input: &DeriveInput, table: &TableDescriptor, infos: &[FieldInfo]) -> TokenStream2 {
    let struct_name = &input.ident;
    let vis = &input.vis;
    let table_name = &table.name;

    // Columns paired with their fields, in declaration order.
    let mapped: Vec<(&ColumnDescriptor, &FieldInfo)> = table
        .columns
        .iter()
        .filter_map(|c| infos.iter().find(|f| f.ident == c.field.as_str()).map(|f| (c, f)))
        .collect();

    let column_names: Vec<&str> = mapped.iter().map(|(c, _)| c.name.as_str()).collect();
    let column_literals = mapped.iter().map(|(c, _)| column_literal(c));
    let association_literals = table.associations.iter().map(|a| {
        let column = &a.column;
        let target = &a.target_table;
        let on_delete = match a.on_delete {
            Some(action) => {
                let action = foreign_key_action_tokens(action);
                quote!(::core::option::Option::Some(#action))
            }
            None => quote!(::core::option::Option::None),
        };
        quote! {
            ::keel_core::descriptor::Association {
                column: ::std::string::String::from(#column),
                target_table: ::std::string::String::from(#target),
                on_delete: #on_delete,
            }
        }
    });
    let model_name = &table.model;

    let to_values = mapped.iter().map(|(_, f)| {
        let ident = &f.ident;
        quote! {
            ::keel_core::builder::ToSqlValue::to_sql_value(
                ::core::clone::Clone::clone(&self.#ident)
            )
        }
    });

    let from_row_fields = infos.iter().map(|f| {
        let ident = &f.ident;
        match mapped.iter().position(|(_, m)| m.ident == f.ident) {
            Some(index) => {
                let column = mapped[index].0.name.as_str();
                quote! {
                    #ident: ::keel_core::row::read_column(row, offset + #index, #column)?
                }
            }
            None => quote! {
                #ident: ::core::default::Default::default()
            },
        }
    });

    let primary_key_value = match mapped.iter().find(|(c, _)| c.primary_key) {
        Some((_, f)) => {
            let ident = &f.ident;
            quote! {
                ::core::option::Option::Some(::keel_core::builder::ToSqlValue::to_sql_value(
                    ::core::clone::Clone::clone(&self.#ident)
                ))
            }
        }
        None => quote!(::core::option::Option::None),
    };

    let column_types: Vec<Ident> = mapped
        .iter()
        .map(|(_, f)| format_ident!("{}{}", struct_name, to_pascal_case(&f.ident.to_string())))
        .collect();

    let column_structs = mapped.iter().zip(&column_types).enumerate().map(|(index, ((c, f), type_name))| {
        let column_name = c.name.as_str();
        let value_type = &f.ty;
        let inner_type = if c.nullable {
            option_inner(&f.ty).unwrap_or(&f.ty)
        } else {
            &f.ty
        };
        let doc = format!("Column `{column_name}` of `{table_name}`.");
        let supports = supported_traits(c.helpers).into_iter().map(|name| {
            let trait_name = format_ident!("{}", name);
            quote!(impl ::keel_core::builder::#trait_name for #type_name {})
        });
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Copy, Default)]
            #vis struct #type_name;

            impl ::keel_core::builder::Column for #type_name {
                type Model = #struct_name;
                type Type = #inner_type;
                type Value = #value_type;

                const NAME: &'static str = #column_name;
                const INDEX: usize = #index;
            }

            #(#supports)*
        }
    });

    let accessors = mapped.iter().zip(&column_types).map(|((_, f), type_name)| {
        let method_name = &f.ident;
        quote! {
            /// Returns the column type for typed conditions and orderings.
            #[inline]
            #[must_use]
            #vis const fn #method_name() -> #type_name {
                #type_name
            }
        }
    });

    quote! {
        #(#column_structs)*

        impl #struct_name {
            #(#accessors)*
        }

        impl ::keel_core::model::Model for #struct_name {
            const TABLE: &'static str = #table_name;
            const COLUMNS: &'static [&'static str] = &[#(#column_names),*];

            fn descriptor() -> ::std::sync::Arc<::keel_core::descriptor::TableDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<
                    ::std::sync::Arc<::keel_core::descriptor::TableDescriptor>,
                > = ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(DESCRIPTOR.get_or_init(|| {
                    ::std::sync::Arc::new(::keel_core::descriptor::TableDescriptor {
                        name: ::std::string::String::from(#table_name),
                        model: ::std::string::String::from(#model_name),
                        columns: ::std::vec![#(#column_literals),*],
                        associations: ::std::vec![#(#association_literals),*],
                    })
                }))
            }

            fn to_values(&self) -> ::std::vec::Vec<::keel_core::builder::SqlValue> {
                ::std::vec![#(#to_values),*]
            }

            fn from_row<R: ::keel_core::row::RowSource + ?Sized>(
                row: &R,
                offset: usize,
            ) -> ::core::result::Result<Self, ::keel_core::row::RowError> {
                ::core::result::Result::Ok(Self {
                    #(#from_row_fields),*
                })
            }

            fn primary_key_value(&self) -> ::core::option::Option<::keel_core::builder::SqlValue> {
                #primary_key_value
            }
        }
    }
}

fn column_literal(c: &ColumnDescriptor) -> TokenStream2 {
    let ColumnDescriptor {
        name,
        field,
        rust_type,
        nullable,
        primary_key,
        auto,
        autoincrement,
        indexed,
        unique,
        ..
    } = c;
    let storage_type = storage_type_tokens(c.storage_type);
    let on_conflict = on_conflict_tokens(c.on_conflict);
    let collate = collate_tokens(c.collate);
    let default_expr = match &c.default_expr {
        Some(expr) => quote!(::core::option::Option::Some(::std::string::String::from(#expr))),
        None => quote!(::core::option::Option::None),
    };
    let helpers = c.helpers.bits();
    quote! {
        ::keel_core::descriptor::ColumnDescriptor {
            name: ::std::string::String::from(#name),
            field: ::std::string::String::from(#field),
            rust_type: ::std::string::String::from(#rust_type),
            storage_type: #storage_type,
            nullable: #nullable,
            primary_key: #primary_key,
            auto: #auto,
            autoincrement: #autoincrement,
            indexed: #indexed,
            unique: #unique,
            on_conflict: #on_conflict,
            collate: #collate,
            default_expr: #default_expr,
            helpers: ::keel_core::descriptor::Helpers::from_bits_retain(#helpers),
        }
    }
}

fn storage_type_tokens(storage_type: StorageType) -> TokenStream2 {
    match storage_type {
        StorageType::Integer => quote!(::keel_core::descriptor::StorageType::Integer),
        StorageType::Text => quote!(::keel_core::descriptor::StorageType::Text),
        StorageType::Real => quote!(::keel_core::descriptor::StorageType::Real),
        StorageType::Blob => quote!(::keel_core::descriptor::StorageType::Blob),
    }
}

fn on_conflict_tokens(on_conflict: OnConflict) -> TokenStream2 {
    match on_conflict {
        OnConflict::None => quote!(::keel_core::descriptor::OnConflict::None),
        OnConflict::Rollback => quote!(::keel_core::descriptor::OnConflict::Rollback),
        OnConflict::Abort => quote!(::keel_core::descriptor::OnConflict::Abort),
        OnConflict::Fail => quote!(::keel_core::descriptor::OnConflict::Fail),
        OnConflict::Ignore => quote!(::keel_core::descriptor::OnConflict::Ignore),
        OnConflict::Replace => quote!(::keel_core::descriptor::OnConflict::Replace),
    }
}

fn collate_tokens(collate: Collate) -> TokenStream2 {
    match collate {
        Collate::Binary => quote!(::keel_core::descriptor::Collate::Binary),
        Collate::NoCase => quote!(::keel_core::descriptor::Collate::NoCase),
        Collate::RTrim => quote!(::keel_core::descriptor::Collate::RTrim),
    }
}

fn foreign_key_action_tokens(action: ForeignKeyAction) -> TokenStream2 {
    match action {
        ForeignKeyAction::NoAction => quote!(::keel_core::descriptor::ForeignKeyAction::NoAction),
        ForeignKeyAction::Restrict => quote!(::keel_core::descriptor::ForeignKeyAction::Restrict),
        ForeignKeyAction::Cascade => quote!(::keel_core::descriptor::ForeignKeyAction::Cascade),
        ForeignKeyAction::SetNull => quote!(::keel_core::descriptor::ForeignKeyAction::SetNull),
        ForeignKeyAction::SetDefault => {
            quote!(::keel_core::descriptor::ForeignKeyAction::SetDefault)
        }
    }
}

/// Capability traits enabled by a helper set, in flag order.
fn supported_traits(helpers: Helpers) -> Vec<&'static str> {
    [
        (Helpers::EQ, "SupportsEq"),
        (Helpers::NOT_EQ, "SupportsNotEq"),
        (Helpers::IS_NULL, "SupportsIsNull"),
        (Helpers::IS_NOT_NULL, "SupportsIsNotNull"),
        (Helpers::IN, "SupportsIn"),
        (Helpers::NOT_IN, "SupportsNotIn"),
        (Helpers::LT, "SupportsLt"),
        (Helpers::LE, "SupportsLe"),
        (Helpers::GT, "SupportsGt"),
        (Helpers::GE, "SupportsGe"),
        (Helpers::BETWEEN, "SupportsBetween"),
        (Helpers::ORDER_ASC, "SupportsOrderAsc"),
        (Helpers::ORDER_DESC, "SupportsOrderDesc"),
    ]
    .into_iter()
    .filter(|(flag, _)| helpers.contains(*flag))
    .map(|(_, name)| name)
    .collect()
}

/// `T` out of `Option<T>`, matched on the last path segment.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table_name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("table")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                table_name = Some(string_value(&meta)?);
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute"))
            }
        })?;
    }
    Ok(table_name)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<Option<ColumnAnnotation>> {
    let mut result: Option<ColumnAnnotation> = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        let annotation = result.get_or_insert_with(ColumnAnnotation::default);
        // `#[column]` maps the field with every default.
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                annotation.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("indexed") {
                annotation.indexed = flag_value(&meta)?;
            } else if meta.path.is_ident("unique") {
                annotation.unique = flag_value(&meta)?;
            } else if meta.path.is_ident("on_conflict") {
                annotation.on_conflict = Some(string_value(&meta)?);
            } else if meta.path.is_ident("collate") {
                annotation.collate = Some(string_value(&meta)?);
            } else if meta.path.is_ident("default_expr") {
                annotation.default_expr = Some(string_value(&meta)?);
            } else if meta.path.is_ident("storage_type") {
                annotation.storage_type = Some(string_value(&meta)?);
            } else if meta.path.is_ident("references") {
                annotation.references = Some(string_value(&meta)?);
            } else if meta.path.is_ident("on_delete") {
                annotation.on_delete = Some(string_value(&meta)?);
            } else if meta.path.is_ident("helpers") {
                annotation.helpers = Some(helper_names(&meta)?);
            } else {
                return Err(meta.error("unsupported column attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn parse_primary_key_attrs(attrs: &[Attribute]) -> syn::Result<Option<PrimaryKeyAnnotation>> {
    let mut result: Option<PrimaryKeyAnnotation> = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("primary_key")) {
        let annotation = result.get_or_insert_with(PrimaryKeyAnnotation::default);
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("auto") {
                annotation.auto = flag_value(&meta)?;
            } else if meta.path.is_ident("autoincrement") {
                annotation.autoincrement = flag_value(&meta)?;
            } else if meta.path.is_ident("on_conflict") {
                annotation.on_conflict = Some(string_value(&meta)?);
            } else {
                return Err(meta.error("unsupported primary_key attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: LitStr = meta.value()?.parse()?;
    Ok(value.value())
}

/// A bare flag means `true`; `flag = false` is accepted too.
fn flag_value(meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

/// `helpers(eq, in_list)` or `helpers = "eq, in_list"`.
fn helper_names(meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<String>> {
    if meta.input.peek(Token![=]) {
        let value = string_value(meta)?;
        return Ok(value.split(',').map(|s| s.trim().to_string()).collect());
    }
    let mut names = Vec::new();
    meta.parse_nested_meta(|inner| {
        let name = inner
            .path
            .get_ident()
            .ok_or_else(|| inner.error("expected a helper name"))?;
        names.push(name.to_string());
        Ok(())
    })?;
    Ok(names)
}
