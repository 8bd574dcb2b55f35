use log::{debug, info, warn};

use crate::error::Error;
use crate::failover::Dispatcher;
use crate::providers::GenerationBackend;
use crate::request::{
  ChatReply, GenerationOutcome, GenerationRequest, GuidedReply,
  GuidedRequestBody,
};
use crate::ModelIdentifier;

/// Chat and guided flows on top of one backend and its candidate ladder
pub struct CompassClient<B>
{   backend: B
  , dispatcher: Dispatcher
  , candidates: Vec<ModelIdentifier>
  , max_prompt_chars: usize
}

impl CompassClient<crate::providers::GeminiClient>
{   /// Gemini backend with the configured ladder and dispatcher
    pub fn from_config(config: &crate::config::CompassConfig) -> Self
    {   let candidates = crate::config::candidate_ladder(&config.backend);
        debug!("Compass candidates: {:?}", candidates);
        CompassClient::new(
          crate::providers::GeminiClient::from_config(&config.backend)
        , Dispatcher::new(&config.dispatch)
        , candidates
        , config.dispatch.max_prompt_chars
        )
    }
}

impl<B: GenerationBackend> CompassClient<B>
{   pub fn new(
      backend: B
    , dispatcher: Dispatcher
    , candidates: Vec<ModelIdentifier>
    , max_prompt_chars: usize
    ) -> Self
    {   CompassClient
        {   backend
          , dispatcher
          , candidates
          , max_prompt_chars
        }
    }

    pub fn candidates(&self) -> &[ModelIdentifier]
    {   &self.candidates
    }

    pub fn dispatcher(&self) -> &Dispatcher
    {   &self.dispatcher
    }

    pub fn backend(&self) -> &B
    {   &self.backend
    }

    /// Dispatch a raw prompt over the candidate ladder
    pub async fn generate(&self, prompt: &str) -> GenerationOutcome
    {   let request = GenerationRequest::new(prompt, self.max_prompt_chars);
        self.dispatcher
          .dispatch(&self.backend, &request, &self.candidates)
          .await
    }

    /// Free chat: persona prompt, reply text and any enumerated options
    pub async fn chat(&self, message: &str) -> Result<ChatReply, Error>
    {   let message = message.trim();
        if message.is_empty()
        {   return Err(Error::InvalidRequest(
              "message is empty".to_string()
            ));
        }

        let prompt = crate::prompt::chat_prompt(message);
        let (reply_text, model_used) = self.generate(&prompt)
          .await
          .into_result()?;

        let options = crate::extract::enumerated_items(&reply_text);
        info!("Chat reply from {} ({} options)", model_used, options.len());
        Ok(ChatReply
        {   reply_text
          , model_used
          , options
        })
    }

    /// Guided questionnaire: the next question, or the mission summary
    /// once every question has been answered
    pub async fn guided(&self, body: &GuidedRequestBody)
      -> Result<GuidedReply, Error>
    {   let total = crate::prompt::question_count();
        if let Some(question) = crate::prompt::question(body.step)
        {   debug!("Guided step {}/{}", body.step, total);
            return Ok(GuidedReply::Question
            {   step: body.step
              , total
              , question: question.to_string()
            });
        }

        if body.answers.is_empty()
        {   warn!("Guided summary requested without answers");
        }
        let prompt = crate::prompt::summary_prompt(&body.answers);
        let (raw, model_used) = self.generate(&prompt)
          .await
          .into_result()?;

        let mission = crate::extract::parse_mission(&raw);
        info!(
          "Mission summary from {}: {} values, {} passions",
          model_used, mission.values.len(), mission.passions.len()
        );
        Ok(GuidedReply::Final
        {   mission
          , model_used
        })
    }
}
