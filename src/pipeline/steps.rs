//! Ordered step descriptors for the staging pipeline.

use crate::{
    config::{PipelineConfig, StagingStrategy},
    error::{Result, StagingError},
    models::{EditInput, InpaintInput, ModelInput, RoomType, Style, VirtualStagingInput},
};

const STRUCTURE_GUARDRAIL: &str = "NEVER remove, move or modify walls, partitions, columns, beams, stairs, windows or existing openings. NEVER create new openings in walls. NEVER turn a window into a door. Keep the camera angle, perspective and lighting direction exactly as they are.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Remove debris and finish raw surfaces in one edit.
    CleanAndFinish,
    /// Furnish the lower part of the room through the gradient mask.
    Stage,
    /// Narrow corrective pass after staging.
    Polish,
    Clean,
    Finish,
    DedicatedStage,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CleanAndFinish => "clean+finish",
            Step::Stage => "stage",
            Step::Polish => "polish",
            Step::Clean => "clean",
            Step::Finish => "finish",
            Step::DedicatedStage => "dedicated-stage",
        }
    }
}

pub struct StepContext<'a> {
    pub style: &'a Style,
    pub room: &'a RoomType,
    pub custom_prompt: Option<&'a str>,
    pub guidance: f32,
    pub steps: u32,
    pub api_token: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    pub step: Step,
    pub model: String,
}

impl StepDescriptor {
    pub fn new(step: Step, model: impl Into<String>) -> Self {
        Self {
            step,
            model: model.into(),
        }
    }

    pub fn needs_mask(&self) -> bool {
        self.step == Step::Stage
    }

    pub fn prompt(&self, ctx: &StepContext<'_>) -> Option<String> {
        match self.step {
            Step::CleanAndFinish => Some(clean_and_finish_prompt(ctx.room, ctx.custom_prompt)),
            Step::Stage => Some(stage_prompt(ctx.room, ctx.style)),
            Step::Polish => Some(polish_prompt().to_string()),
            Step::Clean => Some(clean_prompt(ctx.room)),
            Step::Finish => Some(finish_prompt(ctx.room)),
            Step::DedicatedStage => None,
        }
    }

    pub fn build_input(
        &self,
        ctx: &StepContext<'_>,
        image_url: &str,
        mask: Option<String>,
    ) -> Result<ModelInput> {
        let input = match self.step {
            Step::CleanAndFinish | Step::Polish | Step::Clean | Step::Finish => {
                let prompt = self.prompt(ctx).unwrap_or_default();
                ModelInput::Edit(EditInput::new(image_url, prompt))
            }
            Step::Stage => {
                let mask = mask.ok_or_else(|| {
                    StagingError::Internal("stage step requires an inpainting mask".into())
                })?;
                ModelInput::Inpaint(InpaintInput {
                    image: image_url.to_string(),
                    mask,
                    prompt: stage_prompt(ctx.room, ctx.style),
                    guidance: ctx.guidance,
                    steps: ctx.steps,
                    output_format: "jpg".to_string(),
                })
            }
            Step::DedicatedStage => ModelInput::VirtualStaging(VirtualStagingInput {
                image: image_url.to_string(),
                room: ctx.room.staging_room.clone(),
                furniture_style: ctx.style.staging_style.clone(),
                furniture_items: "Default (AI decides)".to_string(),
                replicate_api_key: ctx.api_token.unwrap_or_default().to_string(),
            }),
        };
        Ok(input)
    }
}

/// Steps to run, in order, for the configured strategy.
pub fn plan(config: &PipelineConfig) -> Vec<StepDescriptor> {
    match config.strategy {
        StagingStrategy::Inpaint => vec![
            StepDescriptor::new(Step::CleanAndFinish, &config.edit_model),
            StepDescriptor::new(Step::Stage, &config.inpaint_model),
            StepDescriptor::new(Step::Polish, &config.edit_model),
        ],
        StagingStrategy::DedicatedModel => vec![
            StepDescriptor::new(Step::Clean, &config.edit_model),
            StepDescriptor::new(Step::Finish, &config.edit_model),
            StepDescriptor::new(Step::DedicatedStage, &config.staging_model),
        ],
    }
}

pub fn clean_and_finish_prompt(room: &RoomType, custom_prompt: Option<&str>) -> String {
    let mut prompt = format!(
        "Prepare this empty {room} for a real-estate listing. {guardrail}\n\
Allowed changes only:\n\
1. Remove all loose construction debris and materials: ladders, buckets, paint cans, tools, trash bags, boards, cardboard, plastic sheeting, cables and anything else lying on the floor or leaning against walls.\n\
2. If the ceiling is bare concrete, paint it smooth white. If walls are bare plaster or concrete, paint them a neutral white.\n\
3. If the floor is raw concrete or plywood, install finished flooring (light hardwood or neutral tiles).\n\
4. Every visible electrical junction box gets a white cover plate: a switch at wall height, an outlet near the floor.\n\
5. If there is no ceiling light at all, add exactly one simple ceiling light.\n\
Do not add any furniture.",
        room = room.name.to_lowercase(),
        guardrail = STRUCTURE_GUARDRAIL,
    );
    if let Some(extra) = custom_prompt.map(str::trim).filter(|extra| !extra.is_empty()) {
        prompt.push_str("\nAdditional instruction: ");
        prompt.push_str(extra);
    }
    prompt
}

pub fn stage_prompt(room: &RoomType, style: &Style) -> String {
    format!(
        "A photorealistic, professionally staged {hint}. Style: {style}. \
Furniture stands naturally on the floor with correct scale, perspective and soft shadows. \
Keep walls, windows and doors unchanged.",
        hint = room.prompt_hint,
        style = style.prompt,
    )
}

pub fn polish_prompt() -> &'static str {
    "Fix only these two things: if any picture or artwork is standing on the floor or leaning against a wall, hang it on the wall at eye level; if no ceiling light is visible, add one simple ceiling light. Do NOT change anything else: furniture, walls, windows, floor, colors and lighting stay exactly as they are."
}

pub fn clean_prompt(room: &RoomType) -> String {
    format!(
        "Remove ALL construction debris and building materials from this {}. \
The floor must be completely clear. Only remove loose objects and mess; do NOT touch walls, partitions, columns, beams, windows, doors, mounted pipes, radiators or room structure.",
        room.name.to_lowercase()
    )
}

pub fn finish_prompt(room: &RoomType) -> String {
    format!(
        "Finish the raw surfaces in this {}. {}\n\
1. If the ceiling is bare concrete, paint it smooth white.\n\
2. If the floor is raw concrete or plywood, add finished flooring (hardwood or tiles).\n\
3. Place a white panel door only in an existing door-sized opening.\n\
4. Every visible electrical junction box gets a white cover plate.",
        room.name.to_lowercase(),
        STRUCTURE_GUARDRAIL
    )
}

pub fn refine_prompt(instruction: &str) -> String {
    format!(
        "{} {} Apply only the requested change and leave everything else in the image untouched.",
        instruction.trim(),
        STRUCTURE_GUARDRAIL
    )
}
