use serenity::all::{ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage, Interaction, ModalInteraction};

use crate::discord::commands::Data;
use crate::discord::errors::{on_interaction_error, Surface};
use crate::discord::state::ComponentAction;
use crate::discord::{intro, roles};
use crate::error::{BotError, BotResult};

/// Routes button clicks and modal submissions; slash commands are left to the framework.
pub async fn dispatch(ctx: &Context, data: &Data, interaction: &Interaction) {
    let (surface, outcome) = match interaction {
        Interaction::Component(component) => (Surface::Component, handle_component(ctx, data, component).await),
        Interaction::Modal(modal) => (Surface::Modal, handle_modal(ctx, data, modal).await),
        _ => return,
    };
    if let Err(e) = outcome {
        on_interaction_error(ctx, data, surface, interaction, e).await;
    }
}

fn ephemeral(content: String) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(content).ephemeral(true))
}

async fn handle_component(ctx: &Context, data: &Data, component: &ComponentInteraction) -> BotResult<()> {
    let custom_id = &component.data.custom_id;
    let action: ComponentAction = match custom_id.parse() {
        Ok(action) => action,
        Err(e) => {
            tracing::debug!("Ignoring component: {}", e);
            return Ok(());
        }
    };

    match action {
        ComponentAction::ToggleRole { panel, role } => {
            let member = component.member.as_ref().ok_or(BotError::MissingField("member"))?;
            let panel = data.config.settings.panel(&panel).ok_or_else(|| BotError::UnknownComponent(custom_id.clone()))?;
            let button = panel.button_for(role).ok_or_else(|| BotError::UnknownComponent(custom_id.clone()))?;

            let change = roles::plan_toggle(&member.roles, role, &panel.competing_roles(role));
            roles::apply_toggle(data.gateway.as_ref(), member.user.id, &change).await?;
            tracing::info!("{} toggled {} ({:?})", member.user.id, button.label, change);
            component.create_response(&ctx.http, ephemeral(roles::confirmation(member.user.id, &button.label, &change))).await?;
        }
        ComponentAction::OpenIntroduction => {
            component.create_response(&ctx.http, CreateInteractionResponse::Modal(intro::introduction_modal())).await?;
        }
        ComponentAction::SubmitIntroduction => return Err(BotError::UnknownComponent(custom_id.clone())),
    }
    Ok(())
}

async fn handle_modal(ctx: &Context, data: &Data, modal: &ModalInteraction) -> BotResult<()> {
    match modal.data.custom_id.parse::<ComponentAction>() {
        Ok(ComponentAction::SubmitIntroduction) => {}
        _ => return Err(BotError::UnknownComponent(modal.data.custom_id.clone())),
    }

    let introduction = intro::parse_submission(&modal.data)?;
    let user = &modal.user;
    let name = modal.member.as_ref().map(|member| member.display_name().to_string()).unwrap_or_else(|| user.name.clone());
    intro::welcome_introduction(&data.config, data.gateway.as_ref(), user.id, &name, Some(user.face()), &introduction).await?;
    modal.create_response(&ctx.http, ephemeral(intro::acknowledgement(user.id))).await?;
    Ok(())
}
