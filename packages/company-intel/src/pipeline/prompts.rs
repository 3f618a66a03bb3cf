//! Prompt templates and system personas.
//!
//! Templates are plain data: a name, the text with `{variable}` slots, and
//! the ordered list of variables the text is allowed to reference. Prompts
//! that end in a sentinel contract instruct the model to answer `NONE`.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::TemplateError;

lazy_static! {
    static ref SLOT: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid slot regex");
}

/// A named prompt with declared variable slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    name: &'static str,
    text: &'static str,
    variables: &'static [&'static str],
}

impl PromptTemplate {
    pub const fn new(
        name: &'static str,
        text: &'static str,
        variables: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            text,
            variables,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn variables(&self) -> &'static [&'static str] {
        self.variables
    }

    /// Check that every slot in the text is a declared variable.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for caps in SLOT.captures_iter(self.text) {
            let slot = &caps[1];
            if !self.variables.iter().any(|v| *v == slot) {
                return Err(TemplateError::UndeclaredVariable {
                    template: self.name.to_string(),
                    variable: slot.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Substitute `values` into the declared slots.
    ///
    /// Substitution is a single pass, so braces inside values are never
    /// re-expanded. Extra values are ignored.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        self.validate()?;

        let mut resolved: IndexMap<&str, &str> = IndexMap::with_capacity(self.variables.len());
        for variable in self.variables {
            let value = values
                .iter()
                .find(|(key, _)| key == variable)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::MissingVariable {
                    template: self.name.to_string(),
                    variable: variable.to_string(),
                })?;
            resolved.insert(*variable, value);
        }

        Ok(SLOT
            .replace_all(self.text, |caps: &regex::Captures| {
                resolved.get(&caps[1]).copied().unwrap_or_default().to_string()
            })
            .into_owned())
    }

    /// SHA-256 of the template text.
    ///
    /// Stored with derived records so output from an older prompt can be
    /// detected after an edit.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0]);
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// The fixed system message for each task family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    EmailPatterns,
    Translation,
    DomainRecognition,
    Summarization,
    RagQuery,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::EmailPatterns => EMAIL_PERSONA,
            Persona::Translation => TRANSLATION_PERSONA,
            Persona::DomainRecognition => DOMAIN_PERSONA,
            Persona::Summarization => SUMMARIZATION_PERSONA,
            Persona::RagQuery => RAG_PERSONA,
        }
    }
}

const EMAIL_PERSONA: &str = "You are a helpful assistant that specialize in identifying patterns in email addresses of a company. You are proficient in recognizing names in hindi, chinese, english, french, spanish, italian, german and more. You are able to expertly filter email addresses that belong to individuals in the company and identify patterns in the email address structure specifically in the local-part of the user email addresses.";

const TRANSLATION_PERSONA: &str =
    "You are a helpful assistant that is able to convert text from any language to English.";

const DOMAIN_PERSONA: &str = "You are a helpful assistant that is able to recognize the domain of a company given it's name and a list of domains";

const SUMMARIZATION_PERSONA: &str = "You are a helpful assistant that extracts factual information about companies from scraped web documents.";

const RAG_PERSONA: &str = "You are a helpful assistant that answers questions about companies using only the context you are given.";

/// Stage 1 of the email chain: keep addresses that carry a person's name.
pub const EMAIL_FILTER: PromptTemplate = PromptTemplate::new(
    "email_filter",
    r#"Employees usually receive a company email address built from their name. An employee called oskar martinez could have any of: oskar@company_domain.com, oskarmartinez@company_domain.com, o.martinez@company_domain.com, m.oskar@company_domain.com, moskar@company_domain.com or omartinez@company_domain.com.

From the email addresses between triple backticks, select every address that contains an employee's first name, last name or name initials, in any language.
Leave out generic addresses named after a product, job title, country or department, for example sales@sama.bs.it, xxx@sama.bs.it, mexico@marcegaglia.com, financial@ibm.co.uk or director@ibm.co.uk.
Output only the selected addresses, nothing else. If no address contains an employee's name, output NONE.

Input emails: ``` {emails} ```

Selected addresses:"#,
    &["emails"],
);

/// Stage 2: per-address structure analysis and the most frequent structure.
pub const EMAIL_STRUCTURE: PromptTemplate = PromptTemplate::new(
    "email_structure",
    r#"Companies build employee email addresses from employee names following a fixed structure.
Analyse each address between triple hashtags individually, then name the structure that occurs most often.

Write your answer under these headings:
1. Individual email analysis:
-Email address:
-Email structure:
2. Comma separated list of all email structures found:
3. Most frequently repeated email structure:

Example:
Input Emails: ###
serge.santamaria@ascometal.com
louis-nicolas.hallez@ascometal.com
etienne.archaud@ascometal.com
contact@ascometal.com
###

1. Individual email analysis:
-Email address: serge.santamaria@ascometal.com
-Email structure: [first name].[last name]@ascometal.com

-Email address: louis-nicolas.hallez@ascometal.com
-Email structure: [first name]-[middle name].[last name]@ascometal.com

-Email address: etienne.archaud@ascometal.com
-Email structure: [first name].[last name]@ascometal.com

-Email address: contact@ascometal.com
-Email structure: NONE

2. Comma separated list of all email structures found: [first name].[last name]@ascometal.com, [first name]-[middle name].[last name]@ascometal.com
3. Most frequently repeated email structure: [first name].[last name]@ascometal.com

Example:
Input Emails: ###
kamynina_ei@nlmk.com
rimskaya_aa@nlmk.com
kruglov_ds@nlmk.com
###

1. Individual email analysis:
-Email address: kamynina_ei@nlmk.com
-Email structure: [last name]_[first name initials (2 initials)]@nlmk.com

-Email address: rimskaya_aa@nlmk.com
-Email structure: [last name]_[first name initials (2 initials)]@nlmk.com

-Email address: kruglov_ds@nlmk.com
-Email structure: [last name]_[first name initials (2 initials)]@nlmk.com

2. Comma separated list of all email structures found: [last name]_[first name initials (2 initials)]@nlmk.com
3. Most frequently repeated email structure: [last name]_[first name initials (2 initials)]@nlmk.com

Input Emails: ###
{personal_emails}
###
If you cannot identify any structure in these emails, output NONE.
Answer:"#,
    &["personal_emails"],
);

/// Stage 3: collapse the analysis into exactly one structure.
pub const EMAIL_SELECT: PromptTemplate = PromptTemplate::new(
    "email_select",
    r#"Below is a structure analysis (between triple backticks) of an email list (between triple hashtags).
Pick the single most common email structure. Output exactly one structure, written like [first name].[last name]@domain, and nothing else.
If the analysis found no structure, output NONE.

Email list: ### {personal_emails} ###

Email structure analysis: ```
{structure}
```

Most common email structure:"#,
    &["personal_emails", "structure"],
);

/// Index-preserving title translation.
pub const TRANSLATE_TITLES: PromptTemplate = PromptTemplate::new(
    "translate_titles",
    r#"For the company called: {company}
The lines between triple backticks are job titles in various languages. Translate every line to English.
Answer with a single comma separated list, one item per input line, in the same order.
If a line is not a job title, write <NOT A JOB TITLE> in its place.
The number of items in your answer must equal the number of input lines: never skip or merge a line, and never add words of your own.

```
{titles}
```

Translated titles in a comma separated list:"#,
    &["company", "titles"],
);

/// Pick the one candidate domain that belongs to the company.
pub const RECOGNIZE_DOMAIN: PromptTemplate = PromptTemplate::new(
    "recognize_domain",
    r#"For the company called: {company}
From the domains between triple backticks, pick the one domain that belongs to {company}.
If none of them belongs to {company}, output NONE.

domains:
```
{domains}
```

{company} domain:"#,
    &["company", "domains"],
);

/// Map stage: extract the requested sections from one chunk.
pub const SUMMARIZE_MAP: PromptTemplate = PromptTemplate::new(
    "summarize_map",
    r#"The following documents are about the company called {company}:
{docs}

From these documents, extract the information requested under each heading below:
Sections:
{sections}

Keep the numbered headings exactly as given. If the documents contain nothing for a section, write NONE under it.
Extract as much relevant information as you can and do not leave anything out.
Answer:"#,
    &["company", "docs", "sections"],
);

/// Reduce stage: merge partial extractions into the same sections.
pub const SUMMARIZE_REDUCE: PromptTemplate = PromptTemplate::new(
    "summarize_reduce",
    r#"The following are partial summaries about the company {company}:
{docs}

Combine their information into the sections below:
Sections:
{sections}

Keep the numbered headings exactly as given. If none of the summaries has information for a section, write NONE under it.
Answer:"#,
    &["company", "docs", "sections"],
);

/// Turn a keyword into a natural question about the company.
pub const KEYWORD_QUESTION: PromptTemplate = PromptTemplate::new(
    "keyword_question",
    r#"For the company called {company}, I was given the keyword phrase: {keyword}
Write one simple question about the company that this keyword stands for.
For the keyword "has electric furnace" the question would be: "Does the company have an electric furnace?"
For the keyword "production sites" the question would be: "Tell me about the company's production sites?"

<QUERY>:"#,
    &["company", "keyword"],
);

/// Refined query sent to retrieval, with the no-answer fallback.
pub const RAG_QUERY: PromptTemplate = PromptTemplate::new(
    "rag_query",
    r#"If you do not know the answer, ignore everything below and output only: <no answer>

For the company called {company}, answer the query below.
If the query asks for the company's domain, it means the company's email domain: in the address sawaiz@ibm.co.uk the domain is ibm.co.uk.
Give a detailed answer with everything you know on the topic, one fact per line.
<QUERY>: {question}"#,
    &["company", "question"],
);

/// Answer a refined query from retrieved chunks.
pub const RAG_ANSWER: PromptTemplate = PromptTemplate::new(
    "rag_answer",
    r#"Use the following pieces of context to answer the question at the end.

{context}

Question: {query}
Helpful Answer:"#,
    &["context", "query"],
);

/// All built-in templates, keyed by name.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: IndexMap<&'static str, PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptRegistry {
    pub fn builtin() -> Self {
        let templates = [
            EMAIL_FILTER,
            EMAIL_STRUCTURE,
            EMAIL_SELECT,
            TRANSLATE_TITLES,
            RECOGNIZE_DOMAIN,
            SUMMARIZE_MAP,
            SUMMARIZE_REDUCE,
            KEYWORD_QUESTION,
            RAG_QUERY,
            RAG_ANSWER,
        ]
        .into_iter()
        .map(|t| (t.name(), t))
        .collect();

        Self { templates }
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Validate every template.
    pub fn validate(&self) -> Result<(), TemplateError> {
        self.iter().try_for_each(PromptTemplate::validate)
    }

    /// Fingerprint over all templates, in registration order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for template in self.iter() {
            hasher.update(template.fingerprint().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
