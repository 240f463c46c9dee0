//! Where each content kind lives and how it is translated.

use crate::job::JobType;
use crate::translate::{CellShape, PayloadShape};

/// How a job's `scope_id` narrows the source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A column on the translation table itself.
    Direct(&'static str),
    /// A column on the parent table, joined on the translation's id column.
    Parent {
        table: &'static str,
        id_column: &'static str,
        column: &'static str,
    },
}

/// One translatable content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSchema {
    /// Name stored in the candidate list.
    pub kind: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub language_column: &'static str,
    pub shape: PayloadShape,
    /// A non-null target value here means the record is already translated.
    pub presence_field: &'static str,
    pub scope: Option<Scope>,
    /// Columns copied verbatim from the source row into the translation.
    pub carried_columns: &'static [&'static str],
}

impl ContentSchema {
    /// Conflict key for upserting a translation.
    pub fn conflict_columns(&self) -> [&'static str; 2] {
        [self.id_column, self.language_column]
    }

    /// Columns read from a source row when translating it.
    pub fn source_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.id_column];
        columns.extend(self.carried_columns.iter().copied());
        for column in self.shape.text_columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }
}

const I18N: ContentSchema = ContentSchema {
    kind: "i18n",
    table: "translations",
    id_column: "key",
    language_column: "language_code",
    shape: PayloadShape::Flat { field: "value" },
    presence_field: "value",
    scope: Some(Scope::Direct("namespace")),
    carried_columns: &["namespace"],
};

const CMS_SECTIONS: ContentSchema = ContentSchema {
    kind: "cms_section",
    table: "cms_section_translations",
    id_column: "section_id",
    language_column: "language_code",
    shape: PayloadShape::Structured {
        fields: &["title", "subtitle", "description"],
        cells: None,
    },
    presence_field: "title",
    scope: Some(Scope::Parent {
        table: "cms_sections",
        id_column: "id",
        column: "page_id",
    }),
    carried_columns: &[],
};

const CMS_ITEMS: ContentSchema = ContentSchema {
    kind: "cms_item",
    table: "cms_item_translations",
    id_column: "item_id",
    language_column: "language_code",
    shape: PayloadShape::Structured {
        fields: &["title", "description"],
        cells: Some(CellShape {
            field: "cells",
            text_fields: &["content", "button_text"],
        }),
    },
    presence_field: "title",
    scope: Some(Scope::Parent {
        table: "cms_items",
        id_column: "id",
        column: "page_id",
    }),
    carried_columns: &[],
};

const TRAINING_MODULES: ContentSchema = ContentSchema {
    kind: "training_module",
    table: "training_module_translations",
    id_column: "module_id",
    language_column: "language_code",
    shape: PayloadShape::Structured {
        fields: &["title", "description", "content"],
        cells: None,
    },
    presence_field: "title",
    scope: Some(Scope::Parent {
        table: "training_modules",
        id_column: "id",
        column: "course_id",
    }),
    carried_columns: &[],
};

const KNOWLEDGE_ARTICLES: ContentSchema = ContentSchema {
    kind: "knowledge_article",
    table: "knowledge_article_translations",
    id_column: "article_id",
    language_column: "language_code",
    shape: PayloadShape::Structured {
        fields: &["title", "summary", "content"],
        cells: None,
    },
    presence_field: "title",
    scope: Some(Scope::Parent {
        table: "knowledge_articles",
        id_column: "id",
        column: "category_id",
    }),
    carried_columns: &[],
};

const HEALTHY_KNOWLEDGE_ITEMS: ContentSchema = ContentSchema {
    kind: "healthy_knowledge_item",
    table: "healthy_knowledge_translations",
    id_column: "item_id",
    language_column: "language_code",
    shape: PayloadShape::Structured {
        fields: &["title", "description", "content"],
        cells: None,
    },
    presence_field: "title",
    scope: Some(Scope::Parent {
        table: "healthy_knowledge_items",
        id_column: "id",
        column: "category_id",
    }),
    carried_columns: &[],
};

const ALL: &[ContentSchema] = &[
    I18N,
    CMS_SECTIONS,
    CMS_ITEMS,
    TRAINING_MODULES,
    KNOWLEDGE_ARTICLES,
    HEALTHY_KNOWLEDGE_ITEMS,
];

/// Content kinds a job type covers, in processing order.
pub fn schemas_for(job_type: JobType) -> &'static [ContentSchema] {
    match job_type {
        JobType::I18n => &ALL[0..1],
        JobType::Cms => &ALL[1..3],
        JobType::Training => &ALL[3..4],
        JobType::Knowledge => &ALL[4..5],
        JobType::HealthyKnowledge => &ALL[5..6],
    }
}

pub fn schema_for_kind(kind: &str) -> Option<&'static ContentSchema> {
    ALL.iter().find(|schema| schema.kind == kind)
}
