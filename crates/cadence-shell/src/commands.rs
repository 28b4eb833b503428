//! Typed shell commands and their dispatch onto the builder.

use std::fmt::Write as _;

use cadence_builder::{
    CellAddress, CellCommit, DimensionFilter, DimensionForm, QuestionEdit, TemplateBuilder,
};
use cadence_client::payload::TemplatePatch;
use cadence_core::models::EntityId;
use cadence_core::rubric::{self, RubricField};

use crate::config::{self, ShellConfig};

pub const HELP: &str = "\
frameworks                         list assessment types
framework <code>                   select an assessment type
templates                          list versions of the selected type
open <template-id>                 open a template
show                               print the open template
new-template <version> <name..>    create the first draft of the selected type
clone <source-id> <version>        copy a template into a new draft
promote                            make the open draft active
rename <name..>                    rename the open draft
describe <text..>                  set the open draft's description
filter all|<dimension-id>          choose which dimension's questions to show
expand <question-id>               show a question's rubric
collapse <question-id>             hide a question's rubric
toggle <question-id>               expand or collapse a question card
add-question                       add a question to the filtered dimension
delete-question <question-id>
text <question-id> <text..>
number <question-id> <number>
required <question-id> yes|no
min <question-id> <score>
max <question-id> <score>
move-to <question-id> <dimension-id>
cell <question-id> <level> label|description|evidence <text..>
                                   (\\n starts a new line in multi-line cells)
add-dimension <weight> <name..>
edit-dimension <id> name|description|weight|order <value..>
delete-dimension <id>
reorder <question-id>..            new order of the visible questions
drag <question-id> <position>      move one visible question
audit                              recent changes to the open template
status                             save indicator
config                             print the active configuration
set-url <url>                      save the API base URL
help
quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Frameworks,
    Framework(String),
    Templates,
    Open(EntityId),
    Show,
    NewTemplate { version: String, name: String },
    Clone { source_id: EntityId, version: String },
    Promote,
    Rename(String),
    Describe(String),
    Filter(DimensionFilter),
    Expand(EntityId),
    Collapse(EntityId),
    Toggle(EntityId),
    AddQuestion,
    DeleteQuestion(EntityId),
    Edit(EntityId, QuestionEdit),
    Cell { address: CellAddress, text: String },
    AddDimension { weight: f64, name: String },
    EditDimension { id: EntityId, field: DimensionAttr, value: String },
    DeleteDimension(EntityId),
    Reorder(Vec<EntityId>),
    Drag { question_id: EntityId, position: usize },
    Audit,
    Status,
    Config,
    SetUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionAttr {
    Name,
    Description,
    Weight,
    Order,
}

fn id(arg: Option<&str>, what: &str) -> Result<EntityId, String> {
    arg.ok_or_else(|| format!("missing {what}"))?
        .parse()
        .map_err(|_| format!("{what} must be a number"))
}

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    arg.ok_or_else(|| format!("missing {what}"))?
        .parse()
        .map_err(|_| format!("{what} must be a number"))
}

fn rest(words: &[&str], what: &str) -> Result<String, String> {
    if words.is_empty() {
        return Err(format!("missing {what}"));
    }
    Ok(words.join(" "))
}

pub fn parse(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((name, args)) = words.split_first() else {
        return Err("empty command".to_string());
    };
    let arg = |i: usize| args.get(i).copied();

    let command = match *name {
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "frameworks" => Command::Frameworks,
        "framework" => Command::Framework(rest(args, "framework code")?),
        "templates" => Command::Templates,
        "open" => Command::Open(id(arg(0), "template id")?),
        "show" => Command::Show,
        "new-template" => Command::NewTemplate {
            version: arg(0).ok_or("missing version")?.to_string(),
            name: rest(args.get(1..).unwrap_or_default(), "name")?,
        },
        "clone" => Command::Clone {
            source_id: id(arg(0), "source template id")?,
            version: arg(1).ok_or("missing version")?.to_string(),
        },
        "promote" => Command::Promote,
        "rename" => Command::Rename(rest(args, "name")?),
        "describe" => Command::Describe(args.join(" ")),
        "filter" => match arg(0) {
            Some("all") => Command::Filter(DimensionFilter::All),
            other => Command::Filter(DimensionFilter::Dimension(id(other, "dimension id")?)),
        },
        "expand" => Command::Expand(id(arg(0), "question id")?),
        "collapse" => Command::Collapse(id(arg(0), "question id")?),
        "toggle" => Command::Toggle(id(arg(0), "question id")?),
        "add-question" => Command::AddQuestion,
        "delete-question" => Command::DeleteQuestion(id(arg(0), "question id")?),
        "text" => Command::Edit(
            id(arg(0), "question id")?,
            QuestionEdit::Text(args.get(1..).unwrap_or_default().join(" ")),
        ),
        "number" => Command::Edit(
            id(arg(0), "question id")?,
            QuestionEdit::Number(arg(1).ok_or("missing number")?.to_string()),
        ),
        "required" => {
            let required = match arg(1) {
                Some("yes" | "y" | "true") => true,
                Some("no" | "n" | "false") => false,
                _ => return Err("required takes yes or no".to_string()),
            };
            Command::Edit(id(arg(0), "question id")?, QuestionEdit::Required(required))
        }
        "min" => Command::Edit(
            id(arg(0), "question id")?,
            QuestionEdit::MinScore(number(arg(1), "score")?),
        ),
        "max" => Command::Edit(
            id(arg(0), "question id")?,
            QuestionEdit::MaxScore(number(arg(1), "score")?),
        ),
        "move-to" => Command::Edit(
            id(arg(0), "question id")?,
            QuestionEdit::Dimension(id(arg(1), "dimension id")?),
        ),
        "cell" => {
            let field: RubricField = arg(2)
                .ok_or("missing field")?
                .parse()
                .map_err(|_| "field must be label, description or evidence".to_string())?;
            let text = args.get(3..).unwrap_or_default().join(" ");
            let text = if field.is_multiline() {
                text.replace("\\n", "\n")
            } else {
                text
            };
            Command::Cell {
                address: CellAddress {
                    question_id: id(arg(0), "question id")?,
                    level: number(arg(1), "level")?,
                    field,
                },
                text,
            }
        }
        "add-dimension" => Command::AddDimension {
            weight: number(arg(0), "weight")?,
            name: rest(args.get(1..).unwrap_or_default(), "name")?,
        },
        "edit-dimension" => {
            let field = match arg(1) {
                Some("name") => DimensionAttr::Name,
                Some("description") => DimensionAttr::Description,
                Some("weight") => DimensionAttr::Weight,
                Some("order") => DimensionAttr::Order,
                _ => return Err("field must be name, description, weight or order".to_string()),
            };
            Command::EditDimension {
                id: id(arg(0), "dimension id")?,
                field,
                value: args.get(2..).unwrap_or_default().join(" "),
            }
        }
        "delete-dimension" => Command::DeleteDimension(id(arg(0), "dimension id")?),
        "reorder" => Command::Reorder(
            args.iter()
                .map(|a| id(Some(*a), "question id"))
                .collect::<Result<_, _>>()?,
        ),
        "drag" => Command::Drag {
            question_id: id(arg(0), "question id")?,
            position: number(arg(1), "position")?,
        },
        "audit" => Command::Audit,
        "status" => Command::Status,
        "config" => Command::Config,
        "set-url" => Command::SetUrl(arg(0).ok_or("missing url")?.to_string()),
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(command)
}

/// Run one command. Returns `false` when the shell should exit.
pub async fn execute(
    builder: &TemplateBuilder,
    config: &mut ShellConfig,
    command: Command,
) -> eyre::Result<bool> {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
        Command::Frameworks => {
            for framework in builder.load_frameworks().await {
                println!("  {:<8} {}", framework.code, framework.name);
            }
        }
        Command::Framework(code) => {
            let mut frameworks = builder.frameworks().await;
            if frameworks.is_empty() {
                frameworks = builder.load_frameworks().await;
            }
            let Some(framework) = frameworks.into_iter().find(|f| f.code == code) else {
                println!("no framework '{code}'");
                return Ok(true);
            };
            let templates = builder.select_framework(framework.id, &framework.code).await;
            println!("{}: {} template(s)", framework.tab_label(), templates.len());
            print_template(builder).await;
        }
        Command::Templates => {
            for t in builder.templates().await {
                println!("  #{:<5} v{:<8} {:<9} {}", t.id, t.version, t.status, t.name);
            }
        }
        Command::Open(template_id) => {
            builder.select_template(template_id).await?;
            print_template(builder).await;
        }
        Command::Show => print_template(builder).await,
        Command::NewTemplate { version, name } => {
            let created = builder.create_template(&name, None, &version).await?;
            println!("created draft #{} v{}", created.id, created.version);
        }
        Command::Clone { source_id, version } => {
            let draft = builder
                .create_draft_from_source(Some(source_id), &version)
                .await?;
            println!("created draft #{} v{}", draft.id, draft.version);
        }
        Command::Promote => {
            let promoted = builder.promote_to_active().await?;
            println!("v{} is now active", promoted.version);
        }
        Command::Rename(name) => {
            builder
                .update_template_metadata(TemplatePatch {
                    name: Some(name),
                    description: None,
                })
                .await?;
        }
        Command::Describe(description) => {
            builder
                .update_template_metadata(TemplatePatch {
                    name: None,
                    description: Some(description),
                })
                .await?;
        }
        Command::Filter(filter) => {
            builder.set_dimension_filter(filter).await?;
            print_template(builder).await;
        }
        Command::Expand(question_id) => {
            builder.expand_question(question_id).await?;
            print_template(builder).await;
        }
        Command::Collapse(question_id) => {
            builder.collapse_question(question_id).await;
            print_template(builder).await;
        }
        Command::Toggle(question_id) => {
            builder.toggle_question(question_id).await?;
            print_template(builder).await;
        }
        Command::AddQuestion => {
            let question = builder.add_question().await?;
            println!(
                "added question {} (#{}); set its text with: text {} <text>",
                question.question_number, question.id, question.id
            );
        }
        Command::DeleteQuestion(question_id) => builder.delete_question(question_id).await?,
        Command::Edit(question_id, edit) => builder.edit_question(question_id, edit).await?,
        Command::Cell { address, text } => {
            let mut editor = builder.open_cell(address).await?;
            editor.set_value(text);
            match builder.commit_cell(&editor).await? {
                CellCommit::Unchanged => println!("unchanged"),
                CellCommit::Saved(completeness) => {
                    println!("rubric {completeness} ({}%)", completeness.percent());
                }
            }
        }
        Command::AddDimension { weight, name } => {
            let mut form = builder.new_dimension_form().await?;
            form.name = name;
            form.weight = weight;
            let dimension = builder.submit_dimension(form).await?;
            println!("added dimension #{} {}", dimension.id, dimension.name);
        }
        Command::EditDimension { id, field, value } => {
            let form = builder.edit_dimension_form(id).await?;
            let form = apply_attr(form, field, value).map_err(|e| eyre::eyre!(e))?;
            builder.submit_dimension(form).await?;
        }
        Command::DeleteDimension(id) => builder.delete_dimension(id).await?,
        Command::Reorder(order) => {
            builder.reorder_questions(&order).await?;
        }
        Command::Drag {
            question_id,
            position,
        } => {
            builder.move_question(question_id, position).await?;
        }
        Command::Audit => {
            for row in builder.audit_log().await? {
                println!(
                    "  {} {:<16} {}.{}: '{}' -> '{}'",
                    row.changed_at.strftime("%Y-%m-%d %H:%M"),
                    row.changed_by,
                    row.entity_type,
                    row.field_name,
                    row.old_value,
                    row.new_value
                );
            }
        }
        Command::Status => {
            println!(
                "save: {:?}, in flight: {}",
                builder.current_save_status(),
                builder.pending_saves()
            );
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config::config_info(config))?);
        }
        Command::SetUrl(url) => {
            config.api_base_url = url;
            config::save_config(config)?;
            println!("saved; restart to connect to the new URL");
        }
    }
    Ok(true)
}

fn apply_attr(mut form: DimensionForm, field: DimensionAttr, value: String) -> Result<DimensionForm, String> {
    match field {
        DimensionAttr::Name => form.name = value,
        DimensionAttr::Description => form.description = value,
        DimensionAttr::Weight => {
            form.weight = value.trim().parse().map_err(|_| "weight must be a number")?;
        }
        DimensionAttr::Order => {
            form.display_order = value.trim().parse().map_err(|_| "order must be a number")?;
        }
    }
    Ok(form)
}

async fn print_template(builder: &TemplateBuilder) {
    let Some(template) = builder.template().await else {
        println!("(no template)");
        return;
    };
    let expanded = builder.expanded_questions().await;
    let filter = builder.dimension_filter().await;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "#{} {} v{} [{}]  rubric {}",
        template.id,
        template.name,
        template.version,
        template.status,
        template.completeness()
    );
    for dimension in template.ordered_dimensions() {
        let marker = if filter.dimension_id() == Some(dimension.id) { '*' } else { ' ' };
        let _ = writeln!(
            out,
            " {marker} dim #{} {} (weight {}, {} questions)",
            dimension.id,
            dimension.name,
            dimension.weight,
            template.question_count(dimension.id)
        );
    }
    for question in builder.visible_questions().await {
        let _ = writeln!(
            out,
            "   q #{:<5} {:<6} {}{}  [{}]",
            question.id,
            question.question_number,
            question.question_text,
            if question.is_required { " *" } else { "" },
            rubric::completeness(&question)
        );
        if expanded.contains(&question.id) {
            for level in question.score_levels().take(rubric::MAX_SCORE_LEVELS as usize) {
                let _ = writeln!(out, "        {level}:");
                for field in RubricField::ALL {
                    let _ = writeln!(
                        out,
                        "          {:<11} {}",
                        field.as_str(),
                        question.cell(level, field).replace('\n', " / ")
                    );
                }
            }
        }
    }
    print!("{out}");
}
